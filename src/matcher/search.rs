//! 搜索上下文：根据 search 范围从目标中选取待匹配的文本

use regex::Regex;

use crate::rule::{KeyedNamespace, SearchScope};
use crate::target::Target;
use crate::utils::VersionExtractor;

/// 待匹配内容：单段文本或文本列表（script-src）
#[derive(Debug, Clone, Copy)]
pub enum SearchContext<'a> {
    Text(&'a str),
    List(&'a [String]),
}

impl<'a> SearchContext<'a> {
    /// 按搜索范围选取上下文，键控范围的键不存在时返回 None
    pub fn select(scope: &SearchScope, target: &'a Target) -> Option<Self> {
        let context = match scope {
            SearchScope::Body => SearchContext::Text(&target.body),
            SearchScope::All => SearchContext::Text(&target.raw_response),
            SearchScope::Headers => SearchContext::Text(&target.raw_headers),
            SearchScope::Script => SearchContext::List(&target.scripts),
            SearchScope::Title => SearchContext::Text(&target.title),
            SearchScope::Cookies => SearchContext::Text(&target.raw_cookies),
            SearchScope::Keyed(ns, key) => SearchContext::Text(keyed_value(target, *ns, key)?),
        };
        Some(context)
    }

    /// 任一元素包含该文本即命中
    pub fn contains(&self, text: &str) -> bool {
        match self {
            SearchContext::Text(s) => s.contains(text),
            SearchContext::List(items) => items.iter().any(|s| s.contains(text)),
        }
    }

    /// 第一个命中的元素提供版本，见 [`VersionExtractor::find`]
    pub fn find_regex(&self, regex: &Regex, offset: usize) -> Option<Option<String>> {
        match self {
            SearchContext::Text(s) => VersionExtractor::find(regex, s, offset),
            SearchContext::List(items) => items
                .iter()
                .find_map(|s| VersionExtractor::find(regex, s, offset)),
        }
    }
}

/// 读取 target[ns][key]，键需为小写
pub fn keyed_value<'a>(target: &'a Target, ns: KeyedNamespace, key: &str) -> Option<&'a str> {
    let map = match ns {
        KeyedNamespace::Headers => &target.headers,
        KeyedNamespace::Meta => &target.meta,
        KeyedNamespace::Cookies => &target.cookies,
    };
    map.get(key).map(String::as_str)
}
