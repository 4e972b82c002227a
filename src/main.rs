use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use rswebanalyzer::{
    Aggression, ConfigManager, Rule, RuleLoader, Ruleset, Technology, WebAnalyzer,
};

#[derive(Parser, Debug)]
#[command(name = "rswebanalyzer")]
#[command(about = "基于声明式规则的网站技术栈识别工具")]
#[command(version)]
struct Args {
    /// 目标URL
    #[arg(short, long)]
    url: Option<String>,

    /// 规则目录
    #[arg(short = 'd', long, default_value = "rules")]
    directory: PathBuf,

    /// 激进等级（0-2）
    #[arg(short, long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=2))]
    aggression: u8,

    /// 自定义 User-Agent
    #[arg(short = 'U', long)]
    user_agent: Option<String>,

    /// 自定义请求头，格式 "Name: value"，可重复
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// 日志详细程度（0-5）
    #[arg(short, long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=5))]
    verbose: u8,

    /// 仅使用指定规则文件检测
    #[arg(short, long)]
    rule: Option<PathBuf>,

    /// 禁止跟随重定向
    #[arg(long)]
    disallow_redirect: bool,

    /// 列出全部规则
    #[arg(long)]
    list_rules: bool,

    /// 更新规则库
    #[arg(long)]
    update: bool,

    /// 请求超时（秒）
    #[arg(short, long, default_value_t = 30)]
    timeout: u64,

    /// 以 JSON 格式输出结果
    #[arg(long)]
    json: bool,
}

fn init_logging(verbose: u8) {
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "off",
            1 => "error",
            2 => "warn",
            3 => "info",
            4 => "debug",
            _ => "trace",
        };
        EnvFilter::new(format!("rswebanalyzer={}", level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_header(line: &str) -> Result<(String, String)> {
    match line.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => bail!("无效的请求头：{}（格式应为 \"Name: value\"）", line),
    }
}

/// 规则列表的单行格式：名称 - 分类[ - 描述]
fn rule_line(rule: &Rule) -> String {
    match &rule.desc {
        Some(desc) if !desc.is_empty() => format!("{} - {} - {}", rule.name, rule.origin, desc),
        _ => format!("{} - {}", rule.name, rule.origin),
    }
}

fn print_rules(ruleset: &Ruleset) {
    for rule in ruleset.iter() {
        println!("{}", rule_line(rule));
    }
}

fn print_results(results: &[Technology], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
    } else {
        for tech in results {
            println!("{}", tech);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    debug!("命令行参数：{:?}", args);

    let mut builder = ConfigManager::custom()
        .rule_dir(&args.directory)
        .aggression(Aggression::try_from(args.aggression)?)
        .allow_redirect(!args.disallow_redirect)
        .timeout(args.timeout);
    if let Some(user_agent) = &args.user_agent {
        builder = builder.user_agent(user_agent);
    }
    for line in &args.headers {
        let (name, value) = parse_header(line)?;
        builder = builder.header(&name, &value);
    }

    let analyzer = WebAnalyzer::new(builder.build()).context("初始化分析器失败")?;

    if args.update {
        if analyzer.update_rules().await? {
            println!("规则库更新完成");
        } else {
            bail!("规则库更新失败");
        }
        return Ok(());
    }

    if !RuleLoader::has_version_marker(&args.directory).await {
        bail!(
            "无效的规则目录：{}，请使用 --update 下载规则库",
            args.directory.display()
        );
    }

    if args.list_rules {
        analyzer.reload_rules().await?;
        print_rules(&*analyzer.list_rules().await);
        return Ok(());
    }

    let Some(url) = args.url.as_deref() else {
        bail!("请通过 -u/--url 指定目标");
    };

    if let Some(rule_path) = &args.rule {
        let result = analyzer.test_rule(url, rule_path).await?;
        let results: Vec<Technology> = result.into_iter().collect();
        return print_results(&results, args.json);
    }

    let results = analyzer
        .start(url, true)
        .await
        .with_context(|| format!("分析 {} 失败", url))?;
    print_results(&results, args.json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("Cookie: a=b; c=d").unwrap(),
            ("Cookie".to_string(), "a=b; c=d".to_string())
        );
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from([
            "rswebanalyzer", "-u", "http://example.com", "-a", "2", "-H", "X-Test: 1", "--json",
        ]);
        assert_eq!(args.aggression, 2);
        assert_eq!(args.headers, vec!["X-Test: 1".to_string()]);
        assert!(args.json);
        assert!(Args::try_parse_from(["rswebanalyzer", "-a", "3"]).is_err());
    }

    #[test]
    fn test_rule_line() {
        let raw = serde_json::from_str(
            r#"{"name": "Nginx", "desc": "web server", "matches": [{"text": "nginx"}]}"#,
        )
        .unwrap();
        let mut rule = Rule::from_raw(raw, "server").unwrap();
        assert_eq!(rule_line(&rule), "Nginx - server - web server");

        rule.desc = None;
        assert_eq!(rule_line(&rule), "Nginx - server");
    }
}
