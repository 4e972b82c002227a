//! 全局错误类型定义

use thiserror::Error;
use regex::Error as RegexError;
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use url::ParseError as UrlParseError;

use crate::condition::ParseError;

#[derive(Error, Debug)]
pub enum RswebanalyzerError {
    // 规则相关错误
    #[error("规则解析失败：{0}")]
    RuleParseError(String),
    #[error("条件表达式解析失败：{0}")]
    ConditionError(#[from] ParseError),

    // 编译相关错误
    #[error("正则编译失败：{0}")]
    RegexCompileError(#[from] RegexError),

    // 配置相关错误
    #[error("配置错误：{0}")]
    ConfigError(String),

    // 网络相关错误
    #[error("网络请求失败：{0}")]
    HttpError(#[from] reqwest::Error),
    #[error("目标不可达：{0}")]
    TargetUnreachable(String),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),

    // 基础错误
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),
    #[error("URL解析失败：{0}")]
    UrlError(#[from] UrlParseError),
    #[error("无效输入：{0}")]
    InvalidInput(String),
}

// 全局Result类型
pub type RswResult<T> = Result<T, RswebanalyzerError>;
