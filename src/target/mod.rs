//! 目标抓取与缓存模块
pub mod cache;
pub mod fetcher;
pub mod model;

pub use self::cache::TargetCache;
pub use self::fetcher::{FetchedResponse, Fetcher, HttpFetcher};
pub use self::model::Target;
