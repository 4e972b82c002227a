//! rswebanalyzer - 基于声明式规则的网站技术栈识别引擎

// 导出全局错误类型
pub use self::error::{RswResult, RswebanalyzerError};

// 导出配置模块
pub use self::config::{Aggression, AnalyzerConfig, ConfigManager, CustomConfigBuilder};

// 导出条件表达式模块核心接口
pub use self::condition::{ConditionParser, ParseError};

// 导出规则模块核心接口
pub use self::rule::{MatchClause, Rule, RuleLoader, RuleUpdater, Ruleset, SearchScope, Technology};

// 导出目标抓取模块核心接口
pub use self::target::{FetchedResponse, Fetcher, HttpFetcher, Target, TargetCache};

// 导出匹配模块核心接口
pub use self::matcher::{ClauseOutcome, MatchEvaluator};

// 导出提取模块与工具模块核心接口
pub use self::extractor::HtmlExtractor;
pub use self::utils::{HeaderConverter, VersionExtractor};

// 导出检测模块核心接口
pub use self::detector::{ImplicationResolver, WebAnalyzer};

// 声明所有子模块
pub mod condition;
pub mod config;
pub mod detector;
pub mod error;
pub mod extractor;
pub mod matcher;
pub mod rule;
pub mod target;
pub mod utils;
