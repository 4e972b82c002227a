//! 规则库更新
//! 比对本地与远程 VERSION，不一致时通过 git 拉取或浅克隆规则仓库

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use reqwest::Client;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use super::loader::{RuleLoader, VERSION_FILE};
use crate::config::AnalyzerConfig;
use crate::error::RswResult;

/// 规则库更新器
pub struct RuleUpdater;

impl RuleUpdater {
    /// 更新规则库，返回是否成功（已是最新版本也视为成功）
    pub async fn update(config: &AnalyzerConfig) -> RswResult<bool> {
        let rule_dir = config.rule_dir.as_path();

        if let Some(local) = RuleLoader::local_version(rule_dir).await {
            match Self::remote_version(config).await {
                Ok(remote) if remote == local => {
                    info!("规则库已是最新版本：{}", local);
                    return Ok(true);
                }
                Ok(remote) => info!("规则库版本 {} -> {}", local, remote),
                Err(e) => warn!("获取远程规则版本失败：{}", e),
            }
        }

        if !Self::git_available().await {
            warn!(
                "未检测到git，请手动执行：git clone --depth 1 https://github.com/{}.git",
                config.repository
            );
            return Ok(false);
        }

        if rule_dir.join(".git").exists() {
            Self::git_pull(rule_dir).await
        } else {
            Self::git_clone(&config.repository, rule_dir).await
        }
    }

    async fn remote_version(config: &AnalyzerConfig) -> RswResult<String> {
        let url = format!(
            "https://raw.githubusercontent.com/{}/master/{}",
            config.repository, VERSION_FILE
        );
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;
        let text = client.get(&url).send().await?.text().await?;
        Ok(text.trim().to_string())
    }

    async fn git_available() -> bool {
        Command::new("git")
            .arg("version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    async fn git_pull(rule_dir: &Path) -> RswResult<bool> {
        debug!("git pull：{}", rule_dir.display());
        if !Self::run_git(&["checkout", "."], Some(rule_dir)).await? {
            return Ok(false);
        }
        Self::run_git(&["pull"], Some(rule_dir)).await
    }

    async fn git_clone(repository: &str, rule_dir: &Path) -> RswResult<bool> {
        let remote = format!("https://github.com/{}.git", repository);
        let target = rule_dir.to_string_lossy().into_owned();
        debug!("git clone：{} -> {}", remote, target);
        Self::run_git(&["clone", "--depth", "1", remote.as_str(), target.as_str()], None).await
    }

    async fn run_git(args: &[&str], cwd: Option<&Path>) -> RswResult<bool> {
        let mut command = Command::new("git");
        command.args(args);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        let status = command.status().await?;
        if !status.success() {
            error!("git {} 执行失败：{}", args.join(" "), status);
        }
        Ok(status.success())
    }
}
