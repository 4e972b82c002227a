//! 推导/排斥关系处理
//! 收集命中规则的 implies / excludes，最终统一剔除被排斥的结果并补充推导出的技术

use std::collections::BTreeSet;

use tracing::debug;

use crate::rule::{Rule, Ruleset, Technology};

/// 单次分析运行内的关系累加器
pub struct ImplicationResolver<'a> {
    ruleset: &'a Ruleset,
    implies: BTreeSet<String>,
    excludes: BTreeSet<String>,
}

impl<'a> ImplicationResolver<'a> {
    pub fn new(ruleset: &'a Ruleset) -> Self {
        Self {
            ruleset,
            implies: BTreeSet::new(),
            excludes: BTreeSet::new(),
        }
    }

    /// 记录命中规则的推导与排斥关系
    pub fn record(&mut self, rule: &Rule) {
        self.implies.extend(rule.implies.iter().cloned());
        self.excludes.extend(rule.excludes.iter().cloned());
    }

    /// 剔除被排斥的结果，再按名称顺序追加推导结果
    ///
    /// 推导出的技术只向前查看一层：合并同名规则的 excludes，但不继续展开它们的 implies
    pub fn resolve(mut self, matched: Vec<Technology>) -> Vec<Technology> {
        let mut results: Vec<Technology> = matched
            .into_iter()
            .filter(|tech| {
                let keep = !self.excludes.contains(&tech.name);
                if !keep {
                    debug!("结果 {}（{}）被排斥", tech.name, tech.origin);
                }
                keep
            })
            .collect();

        let implies = std::mem::take(&mut self.implies);
        for name in &implies {
            for rule in self.ruleset.named(name) {
                self.excludes.extend(rule.excludes.iter().cloned());
            }

            if self.excludes.contains(name) {
                debug!("推导结果 {} 被排斥", name);
                continue;
            }
            results.push(Technology::implied(name));
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::MatchClause;

    fn rule(origin: &str, name: &str, implies: &[&str], excludes: &[&str]) -> Rule {
        Rule {
            name: name.to_string(),
            origin: origin.to_string(),
            desc: None,
            matches: vec![MatchClause::default()],
            condition: None,
            implies: implies.iter().map(|s| s.to_string()).collect(),
            excludes: excludes.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn tech(rule: &Rule) -> Technology {
        Technology {
            name: rule.name.clone(),
            origin: rule.origin.clone(),
            version: None,
            versions: Vec::new(),
        }
    }

    #[test]
    fn test_exclusion_applies_regardless_of_order() {
        let ruleset = Ruleset::new();
        let a = rule("cms", "A", &[], &[]);
        let b = rule("cms", "B", &[], &["A"]);

        let mut resolver = ImplicationResolver::new(&ruleset);
        resolver.record(&a);
        resolver.record(&b);
        let results = resolver.resolve(vec![tech(&a), tech(&b)]);

        let names: Vec<&str> = results.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["B"]);
    }

    #[test]
    fn test_implied_rules_contribute_excludes_one_level() {
        let mut ruleset = Ruleset::new();
        ruleset.insert(rule("language", "PHP", &["Zend"], &["Python"]));
        ruleset.insert(rule("framework", "Zend", &[], &[]));

        let wordpress = rule("cms", "WordPress", &["PHP", "Python", "MySQL"], &[]);
        let mut resolver = ImplicationResolver::new(&ruleset);
        resolver.record(&wordpress);
        let results = resolver.resolve(vec![tech(&wordpress)]);

        let rendered: Vec<(String, String)> =
            results.into_iter().map(|t| (t.name, t.origin)).collect();
        assert_eq!(
            rendered,
            vec![
                ("WordPress".to_string(), "cms".to_string()),
                ("MySQL".to_string(), "implies".to_string()),
                ("PHP".to_string(), "implies".to_string()),
            ]
        );
    }

    #[test]
    fn test_matched_rule_excludes_implied_only_name() {
        let ruleset = Ruleset::new();
        let z = rule("cms", "Z", &["Y"], &[]);
        let x = rule("cms", "X", &[], &["Y"]);

        let mut resolver = ImplicationResolver::new(&ruleset);
        resolver.record(&x);
        resolver.record(&z);
        let results = resolver.resolve(vec![tech(&x), tech(&z)]);

        let names: Vec<&str> = results.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["X", "Z"]);
    }
}
