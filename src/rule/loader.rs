//! 规则加载器
//! 目录结构：<rule_dir>/<分类>/<技术>.json，根目录下的 VERSION 为规则库版本标记

use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use super::model::{RawRule, Rule};
use super::ruleset::Ruleset;
use crate::error::{RswResult, RswebanalyzerError};

/// 规则库版本标记文件名
pub const VERSION_FILE: &str = "VERSION";

/// 规则加载器
pub struct RuleLoader;

impl RuleLoader {
    /// 加载整个规则目录，单个规则文件出错仅记录日志并跳过
    pub async fn load_dir(rule_dir: &Path) -> RswResult<Ruleset> {
        if !is_dir(rule_dir).await {
            return Err(RswebanalyzerError::ConfigError(format!(
                "规则目录不存在：{}",
                rule_dir.display()
            )));
        }

        let mut ruleset = Ruleset::new();
        let mut skipped = 0usize;

        for (origin, category_dir) in Self::categories(rule_dir).await? {
            ruleset.add_origin(&origin);

            for path in Self::json_files(&category_dir).await? {
                match Self::load_file(&path, &origin).await {
                    Ok(rule) => {
                        if let Some(old) = ruleset.insert(rule) {
                            debug!("规则 {}_{} 被同名规则覆盖", old.origin, old.name);
                        }
                    }
                    Err(e) => {
                        skipped += 1;
                        error!("解析规则 {} 失败，错误：{}", path.display(), e);
                    }
                }
            }
        }

        info!(
            "规则加载完成：{} 条规则，{} 个分类，跳过 {} 个",
            ruleset.len(),
            ruleset.origins().len(),
            skipped
        );
        Ok(ruleset)
    }

    /// 读取规则文件原始结构
    pub async fn read_raw(path: &Path) -> RswResult<RawRule> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// 加载单个规则文件并指定分类
    pub async fn load_file(path: &Path, origin: &str) -> RswResult<Rule> {
        let raw = Self::read_raw(path).await?;
        Rule::from_raw(raw, origin)
    }

    /// 规则目录是否包含 VERSION 标记
    pub async fn has_version_marker(rule_dir: &Path) -> bool {
        tokio::fs::metadata(rule_dir.join(VERSION_FILE))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// 读取本地规则库版本（去除首尾空白，空文件视为无版本）
    pub async fn local_version(rule_dir: &Path) -> Option<String> {
        tokio::fs::read_to_string(rule_dir.join(VERSION_FILE))
            .await
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    // 子目录即分类，按名称排序
    async fn categories(rule_dir: &Path) -> RswResult<Vec<(String, PathBuf)>> {
        let mut categories = Vec::new();
        let mut entries = tokio::fs::read_dir(rule_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            // 跳过 .git 等隐藏目录
            if name.starts_with('.') {
                continue;
            }
            categories.push((name, entry.path()));
        }

        categories.sort();
        Ok(categories)
    }

    async fn json_files(category_dir: &Path) -> RswResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(category_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") && entry.file_type().await?.is_file() {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_load_dir_skips_defects() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "VERSION", "20240101\n");
        write(dir.path(), "cms/wordpress.json", r#"{"name": "WordPress", "matches": [{"text": "wp-content"}]}"#);
        write(dir.path(), "cms/broken.json", r#"{"name": "Broken", "matches": [{"regexp": "(x"}]}"#);
        write(dir.path(), "cms/empty.json", r#"{"name": "Empty", "matches": []}"#);
        write(dir.path(), "cms/notes.txt", "ignored");
        write(dir.path(), "server/nginx.json", r#"{"name": "Nginx", "matches": [{"search": "headers[server]", "regexp": "nginx"}]}"#);
        write(dir.path(), "server/bad.json", "{ not json");

        let ruleset = RuleLoader::load_dir(dir.path()).await.unwrap();
        assert_eq!(ruleset.len(), 2);
        assert!(ruleset.get("cms", "WordPress").is_some());
        assert!(ruleset.get("server", "Nginx").is_some());

        assert!(RuleLoader::has_version_marker(dir.path()).await);
        assert_eq!(RuleLoader::local_version(dir.path()).await.as_deref(), Some("20240101"));
    }

    #[tokio::test]
    async fn test_missing_dir_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            RuleLoader::load_dir(&missing).await,
            Err(RswebanalyzerError::ConfigError(_))
        ));
        assert!(!RuleLoader::has_version_marker(&missing).await);
    }
}
