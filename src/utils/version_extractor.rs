//! 版本提取工具模块
//! 负责从正则首个匹配结果中，按分组数量与偏移量提取技术版本号
//! 空版本统一视为未提取到

use regex::{Captures, Regex};

/// 版本提取工具类
pub struct VersionExtractor;

impl VersionExtractor {
    /// 在文本中查找首个匹配并提取版本号
    ///
    /// # 参数
    /// - `regex`: 已编译的（大小写不敏感）正则
    /// - `text`: 搜索文本
    /// - `offset`: 多分组时选取的分组下标（从0开始，不含整体匹配）
    ///
    /// # 返回值
    /// - `None`: 无匹配
    /// - `Some(None)`: 有匹配但版本为空
    /// - `Some(Some(version))`: 有匹配且提取到版本
    pub fn find(regex: &Regex, text: &str, offset: usize) -> Option<Option<String>> {
        regex
            .captures(text)
            .map(|captures| Self::from_captures(&captures, offset))
    }

    /// 从单次匹配的捕获结果中提取版本号
    ///
    /// 1. 无分组：取整体匹配
    /// 2. 仅一个分组：取该分组
    /// 3. 多个分组：取下标为 `offset` 的分组；越界则拼接全部分组
    ///
    /// 未参与匹配的可选分组按空串处理
    pub fn from_captures(captures: &Captures, offset: usize) -> Option<String> {
        let group_count = captures.len().saturating_sub(1);
        let group = |index: usize| captures.get(index).map_or("", |m| m.as_str());

        let version = match group_count {
            0 => group(0).to_string(),
            1 => group(1).to_string(),
            n if offset < n => group(offset + 1).to_string(),
            n => (1..=n).map(group).collect::<String>(),
        };

        if version.is_empty() {
            None
        } else {
            Some(version)
        }
    }

    /// 版本列表去重后按长度升序排列（同长度保持原有顺序）
    pub fn sort_by_length(versions: &mut Vec<String>) {
        let mut seen = Vec::with_capacity(versions.len());
        versions.retain(|v| {
            if seen.contains(v) {
                false
            } else {
                seen.push(v.clone());
                true
            }
        });
        versions.sort_by_key(|v| v.len());
    }
}
