//! 提取模块：从响应正文中提取结构化页面信息
pub mod html_extractor;

pub use self::html_extractor::HtmlExtractor;
