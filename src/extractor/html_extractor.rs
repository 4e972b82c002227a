//! HTML标签提取器
//! 负责从HTML中提取script-src、meta标签和页面标题

use std::cell::{Cell, RefCell};
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts
};
use markup5ever::interface::Attribute;
use tendril::StrTendril;

#[derive(Debug, Default, Clone)]
pub struct HtmlExtractor {
    script_srcs: RefCell<Vec<String>>,
    meta_tags: RefCell<Vec<(String, String)>>,
    title: RefCell<Option<String>>,
    in_title: Cell<bool>,
}

impl TokenSink for HtmlExtractor {
    type Handle = ();

    fn process_token(&self, token: Token, _line: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(Tag { kind: TagKind::StartTag, name, attrs, self_closing, .. }) => {
                match name.as_ref() {
                    "script" => {
                        self.extract_script_src(&attrs);
                        // 脚本内容按原始文本处理，避免其中的 "<" 被误识别为标签
                        if !self_closing {
                            return TokenSinkResult::RawData(RawKind::ScriptData);
                        }
                    }
                    "meta" => self.extract_meta_tags(&attrs),
                    "title" if self.title.borrow().is_none() && !self_closing => {
                        self.in_title.set(true);
                        *self.title.borrow_mut() = Some(String::new());
                        return TokenSinkResult::RawData(RawKind::Rcdata);
                    }
                    _ => {}
                }
            }
            Token::TagToken(Tag { kind: TagKind::EndTag, name, .. }) => {
                if name.as_ref() == "title" {
                    self.in_title.set(false);
                }
            }
            Token::CharacterTokens(text) => {
                if self.in_title.get() {
                    if let Some(title) = self.title.borrow_mut().as_mut() {
                        title.push_str(&text);
                    }
                }
            }
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

impl HtmlExtractor {
    /// 创建新的提取器
    pub fn new() -> Self {
        Self::default()
    }

    /// 从HTML字符串提取标签
    pub fn extract(&self, html: &str) -> Self {
        let tokenizer = Tokenizer::new(self.clone(), TokenizerOpts::default());
        let queue = BufferQueue::default();
        queue.push_back(StrTendril::from(html));

        let _ = tokenizer.feed(&queue);
        tokenizer.end();

        tokenizer.sink
    }

    /// 提取script-src
    fn extract_script_src(&self, attrs: &[Attribute]) {
        for attr in attrs {
            if attr.name.local.as_ref() == "src" {
                self.script_srcs.borrow_mut().push(attr.value.to_string());
                break;
            }
        }
    }

    /// 提取meta标签（content 缺失时记为空串）
    fn extract_meta_tags(&self, attrs: &[Attribute]) {
        let mut name = None;
        let mut content = None;

        for attr in attrs {
            match attr.name.local.as_ref() {
                "name" => name = Some(attr.value.to_string().to_lowercase()),
                "content" => content = Some(attr.value.to_string()),
                _ => {}
            }
        }

        if let Some(n) = name {
            self.meta_tags.borrow_mut().push((n, content.unwrap_or_default()));
        }
    }

    /// 获取提取到的script-src列表
    pub fn get_script_srcs(&self) -> Vec<String> {
        self.script_srcs.borrow().clone()
    }

    /// 获取提取到的meta标签列表
    pub fn get_meta_tags(&self) -> Vec<(String, String)> {
        self.meta_tags.borrow().clone()
    }

    /// 获取第一个title标签的文本
    pub fn get_title(&self) -> String {
        self.title.borrow().clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_extractor() {
        let html = r#"
            <html><head><title>Welcome &amp; Hello</title>
            <script src="/jquery.min.js"></script>
            <meta name="Author" content="test_user">
            <meta name="generator" content="WordPress 6.0" />
            <meta name="keywords">
            </head><body>
            <script>if (a < b) { document.write("<script src='/fake.js'></script>"); }</script>
            <script src="/vue.global.js"></script>
            <title>second</title>
            </body></html>
        "#;

        let extractor = HtmlExtractor::new();
        let result = extractor.extract(html);

        assert_eq!(
            result.get_script_srcs(),
            vec!["/jquery.min.js".to_string(), "/vue.global.js".to_string()]
        );

        assert_eq!(
            result.get_meta_tags(),
            vec![
                ("author".to_string(), "test_user".to_string()),
                ("generator".to_string(), "WordPress 6.0".to_string()),
                ("keywords".to_string(), String::new()),
            ]
        );

        assert_eq!(result.get_title(), "Welcome & Hello");
    }

    #[test]
    fn test_missing_title_is_empty() {
        let result = HtmlExtractor::new().extract("<p>no head</p>");
        assert_eq!(result.get_title(), "");
        assert!(result.get_script_srcs().is_empty());
    }
}
