//! 条件表达式词法分析
//! 输入统一转小写；变量在分词阶段即完成绑定查找，未绑定直接报错

use std::collections::HashMap;
use std::fmt;

use super::ParseError;

/// 词法单元
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Not,
    And,
    Or,
    LParen,
    RParen,
    Variable { name: String, value: bool },
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Not => write!(f, "not"),
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Variable { name, .. } => write!(f, "{}", name),
            Token::Eof => write!(f, "<eof>"),
        }
    }
}

#[inline]
fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_'
}

/// 条件表达式分词器
pub struct Lexer<'a> {
    input: String,
    index: usize,
    bindings: &'a HashMap<String, bool>,
}

impl<'a> Lexer<'a> {
    pub fn new(expression: &str, bindings: &'a HashMap<String, bool>) -> Self {
        Self {
            input: expression.to_lowercase(),
            index: 0,
            bindings,
        }
    }

    /// 一次性切分为完整的词法单元流（以 Eof 结尾）
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token == Token::Eof;
            tokens.push(token);
            if is_eof {
                return Ok(tokens);
            }
        }
    }

    /// 关键字只有在其后不紧跟标识符字符时才成立（输入结束视为非标识符字符）
    fn keyword_at(&self, keyword: &str) -> bool {
        let bytes = self.input.as_bytes();
        let end = self.index + keyword.len();
        bytes.len() >= end
            && &bytes[self.index..end] == keyword.as_bytes()
            && bytes.get(end).map_or(true, |b| !is_ident_byte(*b))
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        let bytes = self.input.as_bytes();

        while self.index < bytes.len() && matches!(bytes[self.index], b' ' | b'\t') {
            self.index += 1;
        }
        if self.index >= bytes.len() {
            return Ok(Token::Eof);
        }

        if self.keyword_at("or") {
            self.index += 2;
            return Ok(Token::Or);
        }
        if self.keyword_at("not") {
            self.index += 3;
            return Ok(Token::Not);
        }
        if self.keyword_at("and") {
            self.index += 3;
            return Ok(Token::And);
        }

        match bytes[self.index] {
            b'(' => {
                self.index += 1;
                Ok(Token::LParen)
            }
            b')' => {
                self.index += 1;
                Ok(Token::RParen)
            }
            _ => {
                let start = self.index;
                while self.index < bytes.len() && is_ident_byte(bytes[self.index]) {
                    self.index += 1;
                }

                if start == self.index {
                    let ch = self.input[start..].chars().next().unwrap_or('\0');
                    return Err(ParseError::UnexpectedCharacter { ch, position: start });
                }

                let name = &self.input[start..self.index];
                match self.bindings.get(name) {
                    Some(value) => Ok(Token::Variable {
                        name: name.to_string(),
                        value: *value,
                    }),
                    None => Err(ParseError::UnboundVariable(name.to_string())),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings(names: &[&str]) -> HashMap<String, bool> {
        names.iter().map(|n| (n.to_string(), true)).collect()
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        let table = bindings(&["android", "order", "nothing"]);
        let tokens = Lexer::new("android or order and nothing", &table).tokenize().unwrap();
        let kinds: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        assert_eq!(kinds, vec!["android", "or", "order", "and", "nothing", "<eof>"]);
    }

    #[test]
    fn test_input_is_lowercased() {
        let table = bindings(&["a", "b"]);
        let tokens = Lexer::new("NOT A\tAND (b)", &table).tokenize().unwrap();
        assert_eq!(tokens[0], Token::Not);
        assert_eq!(tokens[2], Token::And);
        assert_eq!(tokens[3], Token::LParen);
        assert_eq!(tokens.len(), 7);
    }

    #[test]
    fn test_unbound_variable_fails_while_tokenizing() {
        let table = bindings(&["a"]);
        let err = Lexer::new("a and b", &table).tokenize().unwrap_err();
        assert_eq!(err, ParseError::UnboundVariable("b".to_string()));
    }

    #[test]
    fn test_unexpected_character() {
        let table = bindings(&["a", "b"]);
        let err = Lexer::new("a & b", &table).tokenize().unwrap_err();
        assert_eq!(err, ParseError::UnexpectedCharacter { ch: '&', position: 2 });
    }
}
