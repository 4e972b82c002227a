//! 全局配置管理,存储所有可配置项

use std::fmt;
use std::path::PathBuf;

use crate::error::{RswResult, RswebanalyzerError};

/// 默认请求头（模拟常见浏览器）
const DEFAULT_HEADERS: &[(&str, &str)] = &[
    ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
    ("User-Agent", "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36"),
    ("Upgrade-Insecure-Requests", "1"),
    ("Cache-Control", "max-age=0"),
    ("Accept-Language", "zh-CN,zh;q=0.8,en;q=0.6"),
];

/// 抓取激进程度
/// 控制规则引用辅助URL时是否允许发起额外请求
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Aggression {
    /// 仅使用已缓存的目标（主页面 + favicon）
    #[default]
    Passive,
    /// 仅自定义规则分类允许额外请求
    CustomOnly,
    /// 总是允许额外请求
    Aggressive,
}

impl Aggression {
    /// 判断指定分类的规则是否允许额外抓取
    pub fn allows_fetch(&self, origin: &str, custom_origin: &str) -> bool {
        match self {
            Aggression::Passive => false,
            Aggression::CustomOnly => origin == custom_origin,
            Aggression::Aggressive => true,
        }
    }

    pub fn level(&self) -> u8 {
        match self {
            Aggression::Passive => 0,
            Aggression::CustomOnly => 1,
            Aggression::Aggressive => 2,
        }
    }
}

impl TryFrom<u8> for Aggression {
    type Error = RswebanalyzerError;

    fn try_from(level: u8) -> RswResult<Self> {
        match level {
            0 => Ok(Aggression::Passive),
            1 => Ok(Aggression::CustomOnly),
            2 => Ok(Aggression::Aggressive),
            other => Err(RswebanalyzerError::ConfigError(format!(
                "无效的激进等级：{}（仅支持 0/1/2）",
                other
            ))),
        }
    }
}

impl fmt::Display for Aggression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

/// 分析器配置
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    // 规则目录（每个子目录为一个规则分类）
    pub rule_dir: PathBuf,
    // 规则仓库（owner/name），用于规则更新
    pub repository: String,
    // 抓取激进程度
    pub aggression: Aggression,
    // 激进等级为1时允许额外抓取的规则分类
    pub custom_origin: String,
    // 是否跟随重定向
    pub allow_redirect: bool,
    // 超时配置（单位：秒）
    pub timeout: u64,
    // 请求头（有序，后写覆盖先写）
    pub headers: Vec<(String, String)>,
    // 辅助URL预抓取并发上限
    pub max_concurrency: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            rule_dir: PathBuf::from("rules"),
            repository: "webanalyzer/rules".to_string(),
            aggression: Aggression::default(),
            custom_origin: "custom".to_string(),
            allow_redirect: true,
            timeout: 30,
            headers: DEFAULT_HEADERS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            max_concurrency: 8,
        }
    }
}

impl AnalyzerConfig {
    /// 设置请求头（名称忽略大小写，已存在则覆盖）
    pub fn set_header(&mut self, name: &str, value: &str) {
        let value = value.trim().to_string();
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name.trim()))
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name.trim().to_string(), value)),
        }
    }

    /// 读取请求头（名称忽略大小写）
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> AnalyzerConfig {
        AnalyzerConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: AnalyzerConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.rule_dir = path.into();
        self
    }

    pub fn repository(mut self, repository: impl Into<String>) -> Self {
        self.config.repository = repository.into();
        self
    }

    pub fn aggression(mut self, aggression: Aggression) -> Self {
        self.config.aggression = aggression;
        self
    }

    pub fn custom_origin(mut self, origin: impl Into<String>) -> Self {
        self.config.custom_origin = origin.into();
        self
    }

    pub fn allow_redirect(mut self, allow: bool) -> Self {
        self.config.allow_redirect = allow;
        self
    }

    pub fn timeout(mut self, timeout: u64) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.config.set_header(name, value);
        self
    }

    pub fn user_agent(self, user_agent: &str) -> Self {
        self.header("User-Agent", user_agent)
    }

    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.config.max_concurrency = max.max(1);
        self
    }

    pub fn build(self) -> AnalyzerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggression_policy() {
        assert!(!Aggression::Passive.allows_fetch("custom", "custom"));
        assert!(Aggression::CustomOnly.allows_fetch("custom", "custom"));
        assert!(!Aggression::CustomOnly.allows_fetch("cms", "custom"));
        assert!(Aggression::Aggressive.allows_fetch("cms", "custom"));
    }

    #[test]
    fn test_aggression_from_level() {
        assert_eq!(Aggression::try_from(1).unwrap(), Aggression::CustomOnly);
        assert!(Aggression::try_from(3).is_err());
    }

    #[test]
    fn test_builder_overrides_header_case_insensitive() {
        let config = ConfigManager::custom()
            .user_agent("rswebanalyzer-test")
            .header("cookie", "a=b")
            .timeout(5)
            .build();

        assert_eq!(config.header("user-agent"), Some("rswebanalyzer-test"));
        assert_eq!(config.header("Cookie"), Some("a=b"));
        assert_eq!(
            config.headers.iter().filter(|(k, _)| k.eq_ignore_ascii_case("user-agent")).count(),
            1
        );
        assert_eq!(config.timeout, 5);
    }
}
