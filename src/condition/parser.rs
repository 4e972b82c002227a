//! 条件表达式语法分析（递归下降）
//!
//! ```text
//! expression := or_expr
//! or_expr    := and_expr (OR and_expr)*
//! and_expr   := not_expr (AND not_expr)*
//! not_expr   := NOT not_expr | primary
//! primary    := '(' expression ')' | VARIABLE
//! ```

use std::collections::VecDeque;
use std::fmt;

use super::lexer::Token;
use super::ParseError;

/// 表达式语法树
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// 期望操作数处遇到输入结束，求值为 false
    Empty,
    Var { name: String, value: bool },
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn evaluate(&self) -> bool {
        match self {
            Expr::Empty => false,
            Expr::Var { value, .. } => *value,
            Expr::Not(inner) => !inner.evaluate(),
            Expr::And(lhs, rhs) => lhs.evaluate() && rhs.evaluate(),
            Expr::Or(lhs, rhs) => lhs.evaluate() || rhs.evaluate(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Expr::Empty)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Empty => Ok(()),
            Expr::Var { name, .. } => write!(f, "{}", name),
            Expr::Not(inner) => write!(f, "(not {})", inner),
            Expr::And(lhs, rhs) => write!(f, "({} and {})", lhs, rhs),
            Expr::Or(lhs, rhs) => write!(f, "({} or {})", lhs, rhs),
        }
    }
}

/// 基于显式词法流 + 回退队列的递归下降解析器
pub struct Parser {
    tokens: std::vec::IntoIter<Token>,
    pushed: VecDeque<Token>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into_iter(),
            pushed: VecDeque::new(),
        }
    }

    /// 解析完整表达式，残留未消费的词法单元视为非法输入
    pub fn parse(mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expression()?;

        if let Some(token) = self.pushed.pop_front() {
            return Err(ParseError::TrailingInput(token.to_string()));
        }
        if let Some(token) = self.tokens.find(|t| *t != Token::Eof) {
            return Err(ParseError::TrailingInput(token.to_string()));
        }

        Ok(expr)
    }

    fn pop(&mut self) -> Token {
        self.pushed
            .pop_front()
            .or_else(|| self.tokens.next())
            .unwrap_or(Token::Eof)
    }

    fn push(&mut self, token: Token) {
        self.pushed.push_back(token);
    }

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_and()?;
        if lhs.is_empty() {
            return Ok(lhs);
        }

        loop {
            match self.pop() {
                Token::Eof => break,
                Token::Or => {}
                other => {
                    self.push(other);
                    return Ok(lhs);
                }
            }

            let rhs = self.parse_and()?;
            if rhs.is_empty() {
                return Err(ParseError::MissingOperand("or"));
            }
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }

        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_not()?;
        if lhs.is_empty() {
            return Ok(lhs);
        }

        loop {
            match self.pop() {
                Token::Eof => break,
                Token::And => {}
                other => {
                    self.push(other);
                    return Ok(lhs);
                }
            }

            let rhs = self.parse_not()?;
            if rhs.is_empty() {
                return Err(ParseError::MissingOperand("and"));
            }
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }

        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        match self.pop() {
            Token::Eof => Ok(Expr::Empty),
            Token::Not => {
                let inner = self.parse_not()?;
                if inner.is_empty() {
                    return Err(ParseError::MissingOperand("not"));
                }
                Ok(Expr::Not(Box::new(inner)))
            }
            other => {
                self.push(other);
                self.parse_primary()
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.pop() {
            Token::Eof => Ok(Expr::Empty),
            Token::LParen => {
                let inner = self.parse_expression()?;
                match self.pop() {
                    Token::RParen => Ok(inner),
                    _ => Err(ParseError::UnbalancedParenthesis),
                }
            }
            other => {
                self.push(other);
                self.parse_variable()
            }
        }
    }

    fn parse_variable(&mut self) -> Result<Expr, ParseError> {
        match self.pop() {
            Token::Eof => Ok(Expr::Empty),
            Token::Variable { name, value } => Ok(Expr::Var { name, value }),
            other => Err(ParseError::UnexpectedToken {
                expected: "variable",
                found: other.to_string(),
            }),
        }
    }
}
