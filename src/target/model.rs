//! 目标页面数据模型
//! 一次抓取结果经解析后的只读表示，规则匹配全部基于此结构

use std::collections::HashMap;

use md5::{Digest, Md5};

use super::fetcher::FetchedResponse;
use crate::extractor::HtmlExtractor;
use crate::utils::HeaderConverter;

/// 已抓取并解析的目标页面
#[derive(Debug, Clone, Default)]
pub struct Target {
    pub url: String,
    pub body: String,
    /// 小写Header名 -> 值（多值以 ", " 拼接）
    pub headers: HashMap<String, String>,
    pub status: u16,
    /// 按出现顺序排列的 script src
    pub scripts: Vec<String>,
    /// 小写meta名 -> content
    pub meta: HashMap<String, String>,
    pub title: String,
    /// 小写Cookie名 -> 值
    pub cookies: HashMap<String, String>,
    pub raw_cookies: String,
    pub raw_headers: String,
    pub raw_response: String,
    /// 响应体字节的小写十六进制MD5
    pub md5: String,
}

impl Target {
    /// 由原始响应构建目标
    pub fn from_response(response: &FetchedResponse) -> Self {
        let body = String::from_utf8_lossy(&response.body).into_owned();

        let html = HtmlExtractor::new().extract(&body);
        let mut meta = HashMap::new();
        for (name, content) in html.get_meta_tags() {
            // 同名meta后者覆盖前者
            meta.insert(name, content);
        }

        let raw_headers = HeaderConverter::to_raw_lines(&response.headers);
        let raw_response = format!("{}{}", raw_headers, body);

        Self {
            url: response.url.clone(),
            headers: HeaderConverter::to_hashmap(&response.headers),
            status: response.status,
            scripts: html.get_script_srcs(),
            meta,
            title: html.get_title(),
            cookies: HeaderConverter::parse_set_cookies(&response.headers),
            raw_cookies: HeaderConverter::raw_set_cookie(&response.headers),
            raw_headers,
            raw_response,
            md5: format!("{:x}", Md5::digest(&response.body)),
            body,
        }
    }
}
