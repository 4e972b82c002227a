//! HTTP抓取层
//! `Fetcher` 抽象出单次GET请求，默认实现基于 reqwest

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::AnalyzerConfig;
use crate::error::RswResult;

/// 最大重定向次数
const MAX_REDIRECTS: usize = 10;

/// 单次抓取的原始响应
#[derive(Debug, Clone, Default)]
pub struct FetchedResponse {
    pub url: String,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// 抓取器接口，非2xx状态码不视为失败
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> RswResult<FetchedResponse>;
}

/// 基于 reqwest 的默认抓取器
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &AnalyzerConfig) -> RswResult<Self> {
        let redirect = if config.allow_redirect {
            Policy::limited(MAX_REDIRECTS)
        } else {
            Policy::none()
        };

        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(Duration::from_secs(config.timeout))
            .redirect(redirect)
            .default_headers(Self::build_headers(config))
            .build()?;

        Ok(Self { client })
    }

    // 非法的Header名称或值直接跳过
    fn build_headers(config: &AnalyzerConfig) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!("忽略无效请求头：{}: {}", name, value),
            }
        }
        headers
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> RswResult<FetchedResponse> {
        debug!("请求目标：{}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        debug!("请求完成：{} 状态码 {} 响应体 {} 字节", url, status, body.len());

        Ok(FetchedResponse {
            url: url.to_string(),
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;

    #[test]
    fn test_build_headers_skips_invalid() {
        let config = ConfigManager::custom()
            .header("Cookie", "PHPSESSID=abc")
            .header("Bad Header", "x")
            .build();

        let headers = HttpFetcher::build_headers(&config);
        assert_eq!(headers.get("cookie").and_then(|v| v.to_str().ok()), Some("PHPSESSID=abc"));
        assert!(headers.get("user-agent").is_some());
        assert_eq!(headers.len(), config.headers.len() - 1);
    }

    #[test]
    fn test_http_fetcher_builds() {
        let config = ConfigManager::custom().allow_redirect(false).timeout(3).build();
        assert!(HttpFetcher::new(&config).is_ok());
    }
}
