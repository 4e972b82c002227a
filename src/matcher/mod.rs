//! 匹配模块：单个匹配子句对目标的求值
pub mod evaluator;
pub mod search;

pub use self::evaluator::{ClauseOutcome, MatchEvaluator};
pub use self::search::SearchContext;
