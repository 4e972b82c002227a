//! 匹配子句求值器
//! 选取目标（必要时按需抓取）、选取搜索上下文，再依次执行各结构性检查

use std::sync::Arc;

use tracing::debug;
use url::Url;

use super::search::{keyed_value, SearchContext};
use crate::rule::{KeyedPatterns, MatchClause, Pattern};
use crate::target::{Target, TargetCache};
use crate::utils::VersionExtractor;

/// 单个子句的匹配结果（普通的不匹配不是错误）
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClauseOutcome {
    pub matched: bool,
    pub version: Option<String>,
    pub certainty: u8,
}

impl ClauseOutcome {
    pub fn miss() -> Self {
        Self::default()
    }

    fn hit(version: Option<String>, certainty: u8) -> Self {
        Self {
            matched: true,
            version: version.filter(|v| !v.is_empty()),
            certainty,
        }
    }
}

/// 子句求值器
pub struct MatchEvaluator;

impl MatchEvaluator {
    /// 对目标缓存求值单个子句
    ///
    /// `allow_fetch` 为 false 时，未缓存的辅助URL直接视为不匹配
    pub async fn evaluate(
        clause: &MatchClause,
        cache: &TargetCache,
        allow_fetch: bool,
        base_url: &str,
    ) -> ClauseOutcome {
        if !clause.has_structural_key() {
            return ClauseOutcome::miss();
        }

        match Self::select_target(clause, cache, allow_fetch, base_url).await {
            Some(target) => Self::match_target(clause, &target),
            None => ClauseOutcome::miss(),
        }
    }

    /// 将子句中的相对URL解析为绝对URL
    pub fn resolve_url(base_url: &str, url: &str) -> Option<String> {
        Url::parse(base_url)
            .and_then(|base| base.join(url))
            .map(|u| u.to_string())
            .ok()
    }

    async fn select_target(
        clause: &MatchClause,
        cache: &TargetCache,
        allow_fetch: bool,
        base_url: &str,
    ) -> Option<Arc<Target>> {
        let Some(url) = clause.auxiliary_url() else {
            return cache.get_or_fetch(base_url).await.ok();
        };

        let Some(full_url) = Self::resolve_url(base_url, url) else {
            debug!("无法解析子句URL：{}", url);
            return None;
        };

        if let Some(settled) = cache.get(&full_url).await {
            return settled;
        }

        if allow_fetch {
            cache.get_or_fetch(&full_url).await.ok()
        } else {
            debug!("子句引用了URL {}，但当前激进等级不允许额外请求", url);
            None
        }
    }

    /// 对已选定的目标执行全部结构性检查（纯函数，可重复调用）
    pub fn match_target(clause: &MatchClause, target: &Target) -> ClauseOutcome {
        let mut version = clause.version.clone();

        if let Some(status) = clause.status {
            if target.status != status {
                return ClauseOutcome::miss();
            }
        }

        if let Some(md5) = &clause.md5 {
            if target.md5 != *md5 {
                return ClauseOutcome::miss();
            }
        }

        let Some(context) = SearchContext::select(&clause.search, target) else {
            return ClauseOutcome::miss();
        };

        if let Some(text) = &clause.text {
            if !context.contains(text) {
                return ClauseOutcome::miss();
            }
        }

        if let Some(regex) = &clause.regexp {
            match context.find_regex(regex, clause.offset.unwrap_or(0)) {
                None => return ClauseOutcome::miss(),
                Some(found) => {
                    if clause.offset.is_some() {
                        version = found;
                    }
                }
            }
        }

        for keyed in &clause.keyed {
            match Self::match_keyed(keyed, target) {
                None => return ClauseOutcome::miss(),
                Some(Some(found)) => version = Some(found),
                Some(None) => {}
            }
        }

        ClauseOutcome::hit(version, clause.certainty)
    }

    // 键不存在或所有子模式均未命中时返回 None
    fn match_keyed(keyed: &KeyedPatterns, target: &Target) -> Option<Option<String>> {
        let value = keyed_value(target, keyed.namespace, &keyed.key)?;

        if keyed.patterns.is_empty() {
            return Some(None);
        }

        keyed
            .patterns
            .iter()
            .find_map(|pattern| Self::match_pattern(pattern, value))
    }

    fn match_pattern(pattern: &Pattern, value: &str) -> Option<Option<String>> {
        if let Some(text) = &pattern.text {
            if !value.contains(text.as_str()) {
                return None;
            }
        }

        let mut version = pattern.version.clone();
        if let Some(regex) = &pattern.regexp {
            let found = VersionExtractor::find(regex, value, pattern.offset.unwrap_or(0))?;
            if pattern.offset.is_some() {
                version = found;
            }
        }
        Some(version)
    }
}
