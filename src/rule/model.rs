//! 规则数据模型定义
//! Raw* 结构仅负责 JSON 反序列化；加载时一次性转换为带已编译正则的 `Rule`，之后只读

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{RswResult, RswebanalyzerError};

/// 技术检测结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technology {
    pub name: String,
    pub origin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// 各匹配子句提取到的全部版本（去重，按长度升序）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<String>,
}

impl Technology {
    /// 由推导关系产生的结果
    pub fn implied(name: &str) -> Self {
        Self {
            name: name.to_string(),
            origin: "implies".to_string(),
            version: None,
            versions: Vec::new(),
        }
    }
}

// ======== 为 Technology 实现 Display trait（用于 CLI 输出） ========
impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) if !v.is_empty() => write!(f, "{} {}", self.name, v),
            _ => write!(f, "{}", self.name),
        }
    }
}

/// 兼容 "a" 与 ["a", "b"] 两种写法
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

/// 规则文件原始结构
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawRule {
    pub name: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub matches: Vec<RawMatchClause>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub implies: Option<OneOrMany<String>>,
    #[serde(default)]
    pub excludes: Option<OneOrMany<String>>,
}

/// 匹配子句原始结构
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawMatchClause {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub regexp: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub md5: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub certainty: Option<u8>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub headers: Option<BTreeMap<String, OneOrMany<RawPattern>>>,
    #[serde(default)]
    pub meta: Option<BTreeMap<String, OneOrMany<RawPattern>>>,
    #[serde(default)]
    pub cookies: Option<BTreeMap<String, OneOrMany<RawPattern>>>,
}

/// 键控子模式原始结构
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawPattern {
    #[serde(default)]
    pub regexp: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub version: Option<String>,
}

/// 键控命名空间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyedNamespace {
    Headers,
    Meta,
    Cookies,
}

impl KeyedNamespace {
    fn parse(ns: &str) -> Option<Self> {
        match ns {
            "headers" => Some(KeyedNamespace::Headers),
            "meta" => Some(KeyedNamespace::Meta),
            "cookies" => Some(KeyedNamespace::Cookies),
            _ => None,
        }
    }
}

impl fmt::Display for KeyedNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyedNamespace::Headers => "headers",
            KeyedNamespace::Meta => "meta",
            KeyedNamespace::Cookies => "cookies",
        };
        f.write_str(name)
    }
}

/// 搜索范围
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchScope {
    #[default]
    Body,
    /// 原始Header + 响应体
    All,
    Headers,
    Script,
    Title,
    Cookies,
    /// headers[k] / meta[k] / cookies[k]，键已转小写
    Keyed(KeyedNamespace, String),
}

impl SearchScope {
    /// 解析 search 字段，无法识别时返回 None
    pub fn parse(search: &str) -> Option<Self> {
        match search {
            "body" => Some(SearchScope::Body),
            "all" => Some(SearchScope::All),
            "headers" => Some(SearchScope::Headers),
            "script" => Some(SearchScope::Script),
            "title" => Some(SearchScope::Title),
            "cookies" => Some(SearchScope::Cookies),
            _ => {
                let inner = search.strip_suffix(']')?;
                let (ns, key) = inner.split_once('[')?;
                let ns = KeyedNamespace::parse(ns)?;
                Some(SearchScope::Keyed(ns, key.to_lowercase()))
            }
        }
    }
}

/// 已编译的子模式
#[derive(Debug, Clone)]
pub struct Pattern {
    pub regexp: Option<Regex>,
    pub text: Option<String>,
    pub offset: Option<usize>,
    pub version: Option<String>,
}

impl Pattern {
    fn from_raw(raw: RawPattern) -> RswResult<Self> {
        Ok(Self {
            regexp: raw.regexp.as_deref().map(compile_regex).transpose()?,
            text: raw.text,
            offset: raw.offset,
            version: raw.version,
        })
    }
}

/// 某命名空间下某个键的全部子模式（任一命中即可）
#[derive(Debug, Clone)]
pub struct KeyedPatterns {
    pub namespace: KeyedNamespace,
    pub key: String,
    pub patterns: Vec<Pattern>,
}

/// 已编译的匹配子句
#[derive(Debug, Clone, Default)]
pub struct MatchClause {
    pub url: Option<String>,
    pub search: SearchScope,
    pub regexp: Option<Regex>,
    pub text: Option<String>,
    pub md5: Option<String>,
    pub status: Option<u16>,
    pub offset: Option<usize>,
    pub certainty: u8,
    pub version: Option<String>,
    pub keyed: Vec<KeyedPatterns>,
}

impl MatchClause {
    pub fn from_raw(raw: RawMatchClause) -> RswResult<Self> {
        let search = match raw.search.as_deref() {
            None => SearchScope::Body,
            Some(s) => SearchScope::parse(s).unwrap_or_else(|| {
                warn!("无法识别的search字段：{}，按body处理", s);
                SearchScope::Body
            }),
        };

        let mut keyed = Vec::new();
        for (namespace, map) in [
            (KeyedNamespace::Headers, raw.headers),
            (KeyedNamespace::Meta, raw.meta),
            (KeyedNamespace::Cookies, raw.cookies),
        ] {
            for (key, patterns) in map.unwrap_or_default() {
                let patterns = patterns
                    .into_vec()
                    .into_iter()
                    .map(Pattern::from_raw)
                    .collect::<RswResult<Vec<_>>>()?;
                keyed.push(KeyedPatterns {
                    namespace,
                    key: key.to_lowercase(),
                    patterns,
                });
            }
        }

        Ok(Self {
            url: raw.url,
            search,
            regexp: raw.regexp.as_deref().map(compile_regex).transpose()?,
            text: raw.text,
            md5: raw.md5.map(|m| m.to_lowercase()),
            status: raw.status,
            offset: raw.offset,
            certainty: raw.certainty.unwrap_or(100).min(100),
            version: raw.version,
            keyed,
        })
    }

    /// 是否包含任一结构性匹配键
    pub fn has_structural_key(&self) -> bool {
        self.regexp.is_some()
            || self.text.is_some()
            || self.md5.is_some()
            || self.status.is_some()
            || !self.keyed.is_empty()
    }

    /// 是否引用了基础目标以外的URL
    pub fn auxiliary_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| *u != "/")
    }
}

/// 已加载的规则
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    /// 规则分类（所在目录名）
    pub origin: String,
    pub desc: Option<String>,
    pub matches: Vec<MatchClause>,
    pub condition: Option<String>,
    pub implies: BTreeSet<String>,
    pub excludes: BTreeSet<String>,
}

impl Rule {
    /// 从原始结构转换，matches 为空或正则非法均视为规则缺陷
    pub fn from_raw(raw: RawRule, origin: &str) -> RswResult<Self> {
        if raw.matches.is_empty() {
            return Err(RswebanalyzerError::RuleParseError(format!(
                "规则 {} 的 matches 为空",
                raw.name
            )));
        }

        let matches = raw
            .matches
            .into_iter()
            .map(MatchClause::from_raw)
            .collect::<RswResult<Vec<_>>>()?;

        Ok(Self {
            name: raw.name,
            origin: origin.to_string(),
            desc: raw.desc,
            matches,
            condition: raw.condition,
            implies: raw.implies.map(OneOrMany::into_vec).unwrap_or_default().into_iter().collect(),
            excludes: raw.excludes.map(OneOrMany::into_vec).unwrap_or_default().into_iter().collect(),
        })
    }
}

/// 规则正则统一大小写不敏感编译
fn compile_regex(pattern: &str) -> RswResult<Regex> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_scope_parse() {
        assert_eq!(SearchScope::parse("all"), Some(SearchScope::All));
        assert_eq!(
            SearchScope::parse("headers[X-Powered-By]"),
            Some(SearchScope::Keyed(KeyedNamespace::Headers, "x-powered-by".to_string()))
        );
        assert_eq!(
            SearchScope::parse("meta[generator]"),
            Some(SearchScope::Keyed(KeyedNamespace::Meta, "generator".to_string()))
        );
        assert_eq!(SearchScope::parse("footer[x]"), None);
        assert_eq!(SearchScope::parse("everything"), None);
    }

    #[test]
    fn test_rule_from_json() {
        let json = r#"{
            "name": "WordPress",
            "desc": "blog",
            "matches": [
                {"regexp": "wp-content/themes/", "certainty": 80},
                {"search": "meta[Generator]", "regexp": "WordPress ([\\d.]+)", "offset": 0},
                {"headers": {"X-Powered-By": {"text": "PHP"}}},
                {"url": "/readme.html", "text": "WordPress"},
                {"search": "nowhere", "text": "x"}
            ],
            "condition": "0 or 1",
            "implies": "PHP",
            "excludes": ["Joomla", "Drupal"]
        }"#;

        let raw: RawRule = serde_json::from_str(json).unwrap();
        let rule = Rule::from_raw(raw, "cms").unwrap();

        assert_eq!(rule.origin, "cms");
        assert_eq!(rule.matches.len(), 5);
        assert_eq!(rule.matches[0].certainty, 80);
        assert_eq!(rule.matches[1].certainty, 100);
        assert!(rule.matches[0].regexp.as_ref().unwrap().is_match("WP-CONTENT/THEMES/"));
        assert_eq!(rule.matches[2].keyed[0].key, "x-powered-by");
        assert_eq!(rule.matches[3].auxiliary_url(), Some("/readme.html"));
        assert_eq!(rule.matches[4].search, SearchScope::Body);
        assert!(rule.implies.contains("PHP"));
        assert_eq!(rule.excludes.len(), 2);
    }

    #[test]
    fn test_rule_defects() {
        let raw: RawRule = serde_json::from_str(r#"{"name": "Empty", "matches": []}"#).unwrap();
        assert!(matches!(Rule::from_raw(raw, "cms"), Err(RswebanalyzerError::RuleParseError(_))));

        let raw: RawRule =
            serde_json::from_str(r#"{"name": "Broken", "matches": [{"regexp": "(unclosed"}]}"#).unwrap();
        assert!(matches!(Rule::from_raw(raw, "cms"), Err(RswebanalyzerError::RegexCompileError(_))));
    }

    #[test]
    fn test_blank_condition_is_kept() {
        let raw: RawRule =
            serde_json::from_str(r#"{"name": "X", "matches": [{"text": "a"}], "condition": " "}"#).unwrap();
        let rule = Rule::from_raw(raw, "cms").unwrap();
        assert_eq!(rule.condition.as_deref(), Some(" "));
    }

    #[test]
    fn test_structural_keys() {
        let clause = MatchClause::from_raw(RawMatchClause {
            url: Some("/".to_string()),
            certainty: Some(50),
            ..Default::default()
        })
        .unwrap();
        assert!(!clause.has_structural_key());
        assert_eq!(clause.auxiliary_url(), None);
    }

    #[test]
    fn test_technology_display() {
        let mut tech = Technology::implied("PHP");
        assert_eq!(tech.to_string(), "PHP");
        tech.version = Some("7.4".to_string());
        assert_eq!(tech.to_string(), "PHP 7.4");
    }
}
