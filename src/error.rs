use std::fmt::{ Display, Debug, Formatter, Result };

use crate::ast::Kind;

/// Failure while turning a line of text into a value tree.
pub struct ParseError<'a> {
    src: &'a str,
    byte: usize,
    msg: String,
}

impl<'a> ParseError<'a> {
    pub fn new(src: &'a str, byte: usize, msg: impl ToString) -> Self {
        ParseError {
            src,
            byte,
            msg: msg.to_string(),
        }
    }

    pub fn message(&self) -> &str {
        &self.msg
    }

    /// 1-based line and column of the offending character.
    pub fn position(&self) -> (usize, usize) {
        let mut line = 1;
        let mut col = 1;
        for (i, chr) in self.src.char_indices() {
            if i >= self.byte { break }
            if chr == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        (line, col)
    }
}

impl<'a> Display for ParseError<'a> {
    fn fmt(&self, f: &mut Formatter) -> Result {
        let (line, col) = self.position();
        write!(f, "{} at {}:{}", self.msg, line, col)
    }
}

impl<'a> Debug for ParseError<'a> {
    fn fmt(&self, f: &mut Formatter) -> Result {
        Display::fmt(self, f)
    }
}

impl<'a> std::error::Error for ParseError<'a> {}

/// Failure while evaluating. The rendered text becomes the message of an
/// `Error` value.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LispError {
    #[error("Unbound symbol '{0}'")]
    UnboundSymbol(String),

    #[error("Division By Zero")]
    DivisionByZero,

    #[error("Integer Overflow")]
    Overflow,

    #[error("Function '{function}' passed incorrect type for argument {index}. Got {got}, Expected {expected}.")]
    Type {
        function: &'static str,
        index: usize,
        got: Kind,
        expected: Kind,
    },

    #[error("Function '{function}' passed incorrect number of arguments. Got {got}, Expected {expected}.")]
    Arity {
        function: &'static str,
        got: usize,
        expected: usize,
    },

    #[error("Function '{0}' passed {{}}!")]
    EmptyList(&'static str),

    #[error("Function '{function}' cannot define non-symbol. Got {got}, Expected Symbol.")]
    NonSymbol {
        function: &'static str,
        got: Kind,
    },

    #[error("Function format invalid. Symbol '&' not followed by single symbol.")]
    BadVariadic,

    #[error("S-Expression starts with incorrect type. Got {0}, Expected Function.")]
    NotAFunction(Kind),

    /// An `Error` value met during evaluation; carried unchanged.
    #[error("{0}")]
    Raised(String),
}
