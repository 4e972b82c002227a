//! 单次分析运行内的目标缓存
//! 每个URL对应一个 OnceCell 槽位：并发请求同一URL只会触发一次抓取，失败结果同样落定且不重试

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};

use super::fetcher::Fetcher;
use super::model::Target;
use crate::error::{RswResult, RswebanalyzerError};

type Slot = Arc<OnceCell<Option<Arc<Target>>>>;

/// 目标缓存（URL -> 已解析目标）
pub struct TargetCache {
    fetcher: Arc<dyn Fetcher>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl TargetCache {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            slots: Mutex::new(HashMap::new()),
        }
    }

    async fn slot(&self, url: &str) -> Slot {
        let mut slots = self.slots.lock().await;
        slots
            .entry(url.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// 获取目标，未缓存时抓取；失败同样缓存
    pub async fn get_or_fetch(&self, url: &str) -> RswResult<Arc<Target>> {
        let slot = self.slot(url).await;
        let settled = slot
            .get_or_init(|| async {
                match self.fetcher.fetch(url).await {
                    Ok(response) => {
                        debug!("目标已缓存：{}", url);
                        Some(Arc::new(Target::from_response(&response)))
                    }
                    Err(e) => {
                        warn!("目标请求失败：{}，错误：{}", url, e);
                        None
                    }
                }
            })
            .await;

        settled
            .clone()
            .ok_or_else(|| RswebanalyzerError::TargetUnreachable(url.to_string()))
    }

    /// 读取已落定的缓存项：未抓取过返回 None，抓取失败返回 Some(None)
    pub async fn get(&self, url: &str) -> Option<Option<Arc<Target>>> {
        let slots = self.slots.lock().await;
        slots.get(url).and_then(|slot| slot.get().cloned())
    }

    /// 判断URL是否已有落定结果（成功或失败）
    pub async fn contains(&self, url: &str) -> bool {
        self.get(url).await.is_some()
    }

    /// 尽力预取，失败仅记录日志
    pub async fn prime(&self, url: &str) {
        if self.get_or_fetch(url).await.is_err() {
            debug!("预取失败，已忽略：{}", url);
        }
    }
}
