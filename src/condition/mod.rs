//! 条件表达式模块：组合规则中各匹配子句的布尔结果
//! 支持 not / and / or / 括号 / 变量，大小写不敏感
pub mod lexer;
pub mod parser;

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

pub use self::lexer::{Lexer, Token};
pub use self::parser::{Expr, Parser};

/// 条件表达式解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("变量 {0} 不存在")]
    UnboundVariable(String),
    #[error("非法字符 '{ch}'（位置 {position}）")]
    UnexpectedCharacter { ch: char, position: usize },
    #[error("期望 {expected}，实际为 {found}")]
    UnexpectedToken { expected: &'static str, found: String },
    #[error("{0} 缺少操作数")]
    MissingOperand(&'static str),
    #[error("括号不匹配")]
    UnbalancedParenthesis,
    #[error("存在未消费的输入：{0}")]
    TrailingInput(String),
}

/// 条件表达式解析器
pub struct ConditionParser;

impl ConditionParser {
    /// 解析并求值条件表达式
    pub fn parse(expression: &str, bindings: &HashMap<String, bool>) -> Result<bool, ParseError> {
        let expr = Self::compile(expression, bindings)?;
        let value = expr.evaluate();
        debug!("条件求值：{} => {} => {}", expression, expr, value);
        Ok(value)
    }

    /// 解析条件表达式为语法树（变量值在分词时绑定）
    pub fn compile(expression: &str, bindings: &HashMap<String, bool>) -> Result<Expr, ParseError> {
        let tokens = Lexer::new(expression, bindings).tokenize()?;
        Parser::new(tokens).parse()
    }
}
