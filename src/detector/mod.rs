//! 检测模块：规则引擎与推导/排斥关系处理
pub mod detector;
pub mod resolver;

pub use self::detector::WebAnalyzer;
pub use self::resolver::ImplicationResolver;
