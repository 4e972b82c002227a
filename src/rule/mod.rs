//! 规则模块：数据模型、目录加载、规则集与规则库更新
pub mod loader;
pub mod model;
pub mod ruleset;
pub mod updater;

pub use self::loader::RuleLoader;
pub use self::model::{
    KeyedNamespace, KeyedPatterns, MatchClause, Pattern, RawMatchClause, RawPattern, RawRule, Rule,
    SearchScope, Technology,
};
pub use self::ruleset::Ruleset;
pub use self::updater::RuleUpdater;
