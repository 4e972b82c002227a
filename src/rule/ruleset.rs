//! 规则集：按（分类，名称）有序存储，加载完成后只读共享

use std::collections::{BTreeMap, BTreeSet};

use super::model::Rule;

/// 已加载的规则集合
#[derive(Debug, Clone, Default)]
pub struct Ruleset {
    rules: BTreeMap<(String, String), Rule>,
    origins: BTreeSet<String>,
}

impl Ruleset {
    pub fn new() -> Self {
        Self::default()
    }

    /// 规则唯一键：{分类}_{名称}
    pub fn key(rule: &Rule) -> String {
        format!("{}_{}", rule.origin, rule.name)
    }

    /// 插入规则，同分类同名后者覆盖前者
    pub fn insert(&mut self, rule: Rule) -> Option<Rule> {
        self.origins.insert(rule.origin.clone());
        self.rules
            .insert((rule.origin.clone(), rule.name.clone()), rule)
    }

    /// 登记分类（空目录同样计入）
    pub fn add_origin(&mut self, origin: &str) {
        self.origins.insert(origin.to_string());
    }

    pub fn get(&self, origin: &str, name: &str) -> Option<&Rule> {
        self.rules.get(&(origin.to_string(), name.to_string()))
    }

    /// 所有分类中名称为 `name` 的规则
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Rule> + 'a {
        self.origins
            .iter()
            .filter_map(move |origin| self.get(origin, name))
    }

    /// 按分类、名称顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    pub fn origins(&self) -> &BTreeSet<String> {
        &self.origins
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::model::{MatchClause, Rule};

    fn rule(origin: &str, name: &str) -> Rule {
        Rule {
            name: name.to_string(),
            origin: origin.to_string(),
            desc: None,
            matches: vec![MatchClause::default()],
            condition: None,
            implies: Default::default(),
            excludes: Default::default(),
        }
    }

    #[test]
    fn test_order_and_lookup() {
        let mut set = Ruleset::new();
        set.insert(rule("custom", "Zeta"));
        set.insert(rule("cms", "WordPress"));
        set.insert(rule("cms", "Drupal"));
        set.insert(rule("custom", "WordPress"));
        set.add_origin("empty");

        let keys: Vec<String> = set.iter().map(Ruleset::key).collect();
        assert_eq!(keys, vec!["cms_Drupal", "cms_WordPress", "custom_WordPress", "custom_Zeta"]);
        assert_eq!(set.len(), 4);
        assert_eq!(set.origins().len(), 3);
        assert!(set.get("cms", "Drupal").is_some());
        assert_eq!(set.named("WordPress").count(), 2);
    }
}
