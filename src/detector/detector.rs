//! 分析器核心：加载规则、抓取目标、逐条求值规则并处理推导/排斥关系
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

use super::resolver::ImplicationResolver;
use crate::condition::ConditionParser;
use crate::config::{Aggression, AnalyzerConfig};
use crate::error::{RswResult, RswebanalyzerError};
use crate::matcher::MatchEvaluator;
use crate::rule::{Rule, RuleLoader, RuleUpdater, Ruleset, Technology};
use crate::target::{Fetcher, HttpFetcher, TargetCache};
use crate::utils::VersionExtractor;

/// test_rule 使用的规则分类
const TEST_ORIGIN: &str = "test";

/// 网站技术分析器
#[derive(Clone)]
pub struct WebAnalyzer {
    config: AnalyzerConfig,
    fetcher: Arc<dyn Fetcher>,
    ruleset: Arc<RwLock<Arc<Ruleset>>>,
}

impl WebAnalyzer {
    /// 使用默认 HTTP 抓取器创建分析器（规则需显式加载）
    pub fn new(config: AnalyzerConfig) -> RswResult<Self> {
        let fetcher = Arc::new(HttpFetcher::new(&config)?);
        Ok(Self::with_fetcher(config, fetcher))
    }

    /// 使用自定义抓取器创建分析器
    pub fn with_fetcher(config: AnalyzerConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            config,
            fetcher,
            ruleset: Arc::new(RwLock::new(Arc::new(Ruleset::new()))),
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// 重新加载规则目录，返回规则数量
    pub async fn reload_rules(&self) -> RswResult<usize> {
        let ruleset = RuleLoader::load_dir(&self.config.rule_dir).await?;
        let count = ruleset.len();
        *self.ruleset.write().await = Arc::new(ruleset);
        Ok(count)
    }

    /// 当前已加载的规则集
    pub async fn list_rules(&self) -> Arc<Ruleset> {
        self.ruleset.read().await.clone()
    }

    /// 更新规则库
    pub async fn update_rules(&self) -> RswResult<bool> {
        RuleUpdater::update(&self.config).await
    }

    /// 加载规则（可选）后分析目标
    pub async fn start(&self, url: &str, reload: bool) -> RswResult<Vec<Technology>> {
        if reload {
            let count = self.reload_rules().await?;
            debug!("已重新加载 {} 条规则", count);
        }
        self.analyze(url).await
    }

    /// 分析目标，入口URL请求失败时终止本次分析
    pub async fn analyze(&self, url: &str) -> RswResult<Vec<Technology>> {
        let base = base_url(url)?;
        let ruleset = self.list_rules().await;
        let cache = Arc::new(TargetCache::new(self.fetcher.clone()));

        debug!("开始分析：{}", base);
        if cache.get_or_fetch(&base).await.is_err() {
            info!("请求 {} 失败", base);
            return Err(RswebanalyzerError::TargetUnreachable(url.to_string()));
        }

        if let Some(favicon) = MatchEvaluator::resolve_url(&base, "/favicon.ico") {
            cache.prime(&favicon).await;
        }

        self.prefetch(&ruleset, &cache, &base).await;

        let mut resolver = ImplicationResolver::new(&ruleset);
        let mut matched = Vec::new();
        for rule in ruleset.iter() {
            if let Some(tech) = self.check_rule(rule, &cache, &base).await {
                resolver.record(rule);
                matched.push(tech);
            }
        }

        let results = resolver.resolve(matched);
        debug!("分析完成：{}，识别到 {} 项技术", base, results.len());
        Ok(results)
    }

    /// 使用单个规则文件检测目标（规则分类固定为 test）
    pub async fn test_rule(&self, url: &str, rule_path: &Path) -> RswResult<Option<Technology>> {
        if tokio::fs::metadata(rule_path).await.is_err() {
            warn!("规则文件 {} 不存在", rule_path.display());
            return Ok(None);
        }

        let base = base_url(url)?;
        let cache = TargetCache::new(self.fetcher.clone());
        cache.get_or_fetch(&base).await?;

        let raw = RuleLoader::read_raw(rule_path).await?;
        if raw.matches.is_empty() {
            info!("规则 {} 的 matches 为空", raw.name);
            return Ok(None);
        }

        let rule = Rule::from_raw(raw, TEST_ORIGIN)?;
        Ok(self.check_rule(&rule, &cache, &base).await)
    }

    /// 求值单条规则：逐个子句求值后交由条件表达式（或默认的或关系）组合
    pub async fn check_rule(
        &self,
        rule: &Rule,
        cache: &TargetCache,
        base_url: &str,
    ) -> Option<Technology> {
        let allow_fetch = self
            .config
            .aggression
            .allows_fetch(&rule.origin, &self.config.custom_origin);

        let mut cond_map = HashMap::with_capacity(rule.matches.len());
        let mut version = None;
        let mut versions = Vec::new();

        for (index, clause) in rule.matches.iter().enumerate() {
            let outcome = MatchEvaluator::evaluate(clause, cache, allow_fetch, base_url).await;
            if outcome.matched {
                if let Some(v) = outcome.version {
                    version.get_or_insert_with(|| v.clone());
                    versions.push(v);
                }
            }
            cond_map.insert(index.to_string(), outcome.matched);
        }

        let is_match = match &rule.condition {
            None => cond_map.values().any(|m| *m),
            Some(condition) => match ConditionParser::parse(condition, &cond_map) {
                Ok(value) => value,
                Err(e) => {
                    warn!(
                        "规则 {}_{} 的条件表达式 \"{}\" 无效，已跳过：{}",
                        rule.origin, rule.name, condition, e
                    );
                    return None;
                }
            },
        };

        debug!("规则 {}_{} 匹配结果：{}", rule.origin, rule.name, is_match);
        if !is_match {
            return None;
        }

        VersionExtractor::sort_by_length(&mut versions);
        Some(Technology {
            name: rule.name.clone(),
            origin: rule.origin.clone(),
            version,
            versions,
        })
    }

    /// 并发预取规则可能用到的辅助URL
    ///
    /// 仅在最高激进等级（所有规则均可请求）下进行，其它等级按规则顺序逐条请求
    async fn prefetch(&self, ruleset: &Ruleset, cache: &Arc<TargetCache>, base_url: &str) {
        if self.config.aggression != Aggression::Aggressive {
            return;
        }

        let urls: BTreeSet<String> = ruleset
            .iter()
            .flat_map(|rule| rule.matches.iter())
            .filter(|clause| clause.has_structural_key())
            .filter_map(|clause| {
                clause
                    .auxiliary_url()
                    .and_then(|u| MatchEvaluator::resolve_url(base_url, u))
            })
            .collect();

        if urls.is_empty() {
            return;
        }
        debug!("预取 {} 个辅助URL", urls.len());

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for url in urls {
            let cache = cache.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                cache.prime(&url).await;
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!("预取任务异常退出：{}", e);
            }
        }
    }
}

/// 校验并规范化目标URL，仅支持 http/https
fn base_url(url: &str) -> RswResult<String> {
    let parsed = Url::parse(url)?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed.to_string()),
        other => Err(RswebanalyzerError::InvalidInput(format!(
            "不支持的协议：{}（{}）",
            other, url
        ))),
    }
}
