//! Header格式转换工具
use std::collections::HashMap;

use reqwest::header::{HeaderMap, SET_COOKIE};
use tracing::warn;

/// 单个响应允许处理的最大Header条目数
const MAX_HEADER_ITEMS: usize = 1000;

/// Header转换工具
pub struct HeaderConverter;

impl HeaderConverter {
    /// 将HeaderMap转换为 小写名称 -> 值 的映射，同名多值以 ", " 拼接
    pub fn to_hashmap(header_map: &HeaderMap) -> HashMap<String, String> {
        let mut map = HashMap::new();
        for (key, values) in Self::grouped(header_map) {
            map.insert(key, values.join(", "));
        }
        map
    }

    /// 生成原始Header文本：每个Header一行 "name: value"，以换行拼接
    pub fn to_raw_lines(header_map: &HeaderMap) -> String {
        Self::grouped(header_map)
            .into_iter()
            .map(|(key, values)| format!("{}: {}", key, values.join(", ")))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 原始 Set-Cookie 文本（多条以 ", " 拼接）
    pub fn raw_set_cookie(header_map: &HeaderMap) -> String {
        header_map
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// 解析 Set-Cookie → 小写Cookie名 -> 值（同名后者覆盖前者）
    pub fn parse_set_cookies(header_map: &HeaderMap) -> HashMap<String, String> {
        let mut cookies = HashMap::new();
        for value in header_map.get_all(SET_COOKIE).iter() {
            let raw = String::from_utf8_lossy(value.as_bytes());
            Self::parse_set_cookie(&raw, &mut cookies);
        }
        cookies
    }

    /// 按Header名称分组（保持首次出现顺序），值按原始字节宽松解码
    fn grouped(header_map: &HeaderMap) -> Vec<(String, Vec<String>)> {
        let mut groups: Vec<(String, Vec<String>)> = Vec::new();

        for (iter_count, (key, value)) in header_map.iter().enumerate() {
            if iter_count >= MAX_HEADER_ITEMS {
                warn!("Header迭代超过{}次，强制终止", MAX_HEADER_ITEMS);
                break;
            }

            let key_str = key.as_str().to_lowercase();
            let value_str = String::from_utf8_lossy(value.as_bytes()).into_owned();

            match groups.iter_mut().find(|(k, _)| *k == key_str) {
                Some((_, values)) => values.push(value_str),
                None => groups.push((key_str, vec![value_str])),
            }
        }
        groups
    }

    // 解析单条 Set-Cookie，仅取首段 name=value
    fn parse_set_cookie(raw_cookie: &str, cookies: &mut HashMap<String, String>) {
        let cookie_str = raw_cookie.trim();
        if cookie_str.is_empty() { return; }

        let Some(core_kv) = cookie_str.split(';').map(|s| s.trim()).find(|s| !s.is_empty()) else {
            return;
        };

        let Some(pos) = core_kv.find('=') else { return; };
        let (name, value) = (core_kv[..pos].trim(), core_kv[pos + 1..].trim());
        if name.is_empty() {
            return;
        }

        cookies.insert(name.to_ascii_lowercase(), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn sample_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("server", HeaderValue::from_static("nginx/1.18.0"));
        headers.append("set-cookie", HeaderValue::from_static("PHPSESSID=abc123; path=/"));
        headers.append("set-cookie", HeaderValue::from_static("Lang=zh-CN; HttpOnly"));
        headers.insert("x-powered-by", HeaderValue::from_static("PHP/7.4.3"));
        headers
    }

    #[test]
    fn test_to_hashmap_joins_multi_values() {
        let map = HeaderConverter::to_hashmap(&sample_headers());
        assert_eq!(map.get("server").map(String::as_str), Some("nginx/1.18.0"));
        assert_eq!(
            map.get("set-cookie").map(String::as_str),
            Some("PHPSESSID=abc123; path=/, Lang=zh-CN; HttpOnly")
        );
    }

    #[test]
    fn test_raw_lines() {
        let raw = HeaderConverter::to_raw_lines(&sample_headers());
        assert!(raw.contains("server: nginx/1.18.0"));
        assert!(raw.contains("x-powered-by: PHP/7.4.3"));
        assert_eq!(raw.lines().count(), 3);
    }

    #[test]
    fn test_set_cookie_parsing() {
        let headers = sample_headers();
        let cookies = HeaderConverter::parse_set_cookies(&headers);
        assert_eq!(cookies.get("phpsessid").map(String::as_str), Some("abc123"));
        assert_eq!(cookies.get("lang").map(String::as_str), Some("zh-CN"));
        assert_eq!(
            HeaderConverter::raw_set_cookie(&headers),
            "PHPSESSID=abc123; path=/, Lang=zh-CN; HttpOnly"
        );
    }
}
