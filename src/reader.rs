use std::iter::Peekable;
use std::str::CharIndices;

use crate::ast::*;
use crate::error::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delim {
    Paren,
    Brace,
}

impl Delim {
    fn opened_by(chr: char) -> Option<Delim> {
        match chr {
            '(' => Some(Delim::Paren),
            '{' => Some(Delim::Brace),
            _ => None,
        }
    }

    fn closed_by(chr: char) -> Option<Delim> {
        match chr {
            ')' => Some(Delim::Paren),
            '}' => Some(Delim::Brace),
            _ => None,
        }
    }

    pub fn open(self) -> char {
        match self {
            Delim::Paren => '(',
            Delim::Brace => '{',
        }
    }

    pub fn close(self) -> char {
        match self {
            Delim::Paren => ')',
            Delim::Brace => '}',
        }
    }

    fn wrap(self, items: Vec<Value>) -> Value {
        match self {
            Delim::Paren => Value::SExpr(items),
            Delim::Brace => Value::QExpr(items),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Open(Delim),
    Close(Delim),
    Number(i64),
    Symbol(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token's first character.
    pub byte: usize,
}

pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    const SYMBOL_CHARS: &'static str = "_+-*/\\=<>!&?";

    pub fn new(source: &'a str) -> Lexer<'a> {
        Lexer {
            source,
            chars: source.char_indices().peekable(),
        }
    }

    fn is_symbol_char(chr: char) -> bool {
        chr.is_ascii_alphanumeric() || Self::SYMBOL_CHARS.contains(chr)
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, chr)) = self.chars.peek() {
            if !chr.is_whitespace() { return }
            self.chars.next();
        }
    }

    fn atom(&mut self, start: usize) -> Result<TokenKind, ParseError<'a>> {
        let mut end = start;
        while let Some(&(i, chr)) = self.chars.peek() {
            if !Self::is_symbol_char(chr) { break }
            end = i + chr.len_utf8();
            self.chars.next();
        }

        let text = &self.source[start..end];
        let digits = text.strip_prefix('-').unwrap_or(text);

        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            let num: i64 = text
                .parse()
                .map_err(|_| ParseError::new(self.source, start, format!("invalid number '{text}'")))?;
            Ok(TokenKind::Number(num))
        } else {
            Ok(TokenKind::Symbol(text.to_string()))
        }
    }

    pub fn next_token(&mut self) -> Result<Option<Token>, ParseError<'a>> {
        self.skip_whitespace();

        let Some(&(byte, chr)) = self.chars.peek() else {
            return Ok(None);
        };

        let kind = if let Some(delim) = Delim::opened_by(chr) {
            self.chars.next();
            TokenKind::Open(delim)
        } else if let Some(delim) = Delim::closed_by(chr) {
            self.chars.next();
            TokenKind::Close(delim)
        } else if Self::is_symbol_char(chr) {
            self.atom(byte)?
        } else {
            return Err(ParseError::new(self.source, byte, format!("unexpected char '{chr}'")));
        };

        Ok(Some(Token { kind, byte }))
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError<'_>> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

pub struct Reader<'a> {
    source: &'a str,
    tokens: std::vec::IntoIter<Token>,
    depth: usize,
}

impl<'a> Reader<'a> {
    /// Deepest bracket nesting accepted. Parsing and evaluation both recurse
    /// once per level.
    pub const MAX_DEPTH: usize = 512;

    pub fn new(source: &'a str) -> Result<Reader<'a>, ParseError<'a>> {
        Ok(Reader {
            source,
            tokens: tokenize(source)?.into_iter(),
            depth: 0,
        })
    }

    fn error(&self, byte: usize, msg: impl ToString) -> ParseError<'a> {
        ParseError::new(self.source, byte, msg)
    }

    /// Parses the whole input as one implicit S-Expression.
    pub fn parse_program(&mut self) -> Result<Value, ParseError<'a>> {
        Ok(Value::SExpr(self.parse_exprs(None)?))
    }

    /// Reads expressions until the closing bracket of `open`, or until the
    /// end of input at top level.
    fn parse_exprs(&mut self, open: Option<(Delim, usize)>) -> Result<Vec<Value>, ParseError<'a>> {
        let mut exprs = Vec::new();

        loop {
            let Some(Token { kind, byte }) = self.tokens.next() else {
                return match open {
                    None => Ok(exprs),
                    Some((delim, at)) => Err(self.error(at, format!("unmatched '{}'", delim.open()))),
                };
            };

            match kind {
                TokenKind::Number(n) => exprs.push(Value::Number(n)),
                TokenKind::Symbol(s) => exprs.push(Value::Symbol(s)),
                TokenKind::Open(delim) => {
                    if self.depth == Self::MAX_DEPTH {
                        return Err(self.error(
                            byte,
                            format!("nesting deeper than {} brackets", Self::MAX_DEPTH),
                        ));
                    }

                    self.depth += 1;
                    let inner = self.parse_exprs(Some((delim, byte)))?;
                    self.depth -= 1;
                    exprs.push(delim.wrap(inner));
                }
                TokenKind::Close(delim) => {
                    return match open {
                        Some((expected, _)) if expected == delim => Ok(exprs),
                        Some((expected, _)) => Err(self.error(
                            byte,
                            format!("expected '{}', found '{}'", expected.close(), delim.close()),
                        )),
                        None => Err(self.error(byte, format!("unmatched '{}'", delim.close()))),
                    };
                }
            }
        }
    }
}

/// Lexes and parses one line of input.
pub fn read(source: &str) -> Result<Value, ParseError<'_>> {
    Reader::new(source)?.parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Value {
        Value::symbol(s)
    }

    #[test]
    fn lexes_numbers_and_symbols() {
        let kinds: Vec<_> = tokenize("(- 100) -5 add-together <= {}")
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect();

        assert_eq!(
            kinds,
            vec![
                TokenKind::Open(Delim::Paren),
                TokenKind::Symbol(String::from("-")),
                TokenKind::Number(100),
                TokenKind::Close(Delim::Paren),
                TokenKind::Number(-5),
                TokenKind::Symbol(String::from("add-together")),
                TokenKind::Symbol(String::from("<=")),
                TokenKind::Open(Delim::Brace),
                TokenKind::Close(Delim::Brace),
            ],
        );
    }

    #[test]
    fn token_offsets() {
        let tokens = tokenize("  +  12").unwrap();
        assert_eq!(tokens[0].byte, 2);
        assert_eq!(tokens[1].byte, 5);
    }

    #[test]
    fn top_level_is_implicit_sexpr() {
        assert_eq!(
            read("+ 1 (* 2 3) {x}").unwrap(),
            Value::SExpr(vec![
                sym("+"),
                Value::Number(1),
                Value::SExpr(vec![sym("*"), Value::Number(2), Value::Number(3)]),
                Value::QExpr(vec![sym("x")]),
            ]),
        );
        assert_eq!(read("").unwrap(), Value::unit());
        assert_eq!(read(" \n\t ").unwrap(), Value::unit());
    }

    #[test]
    fn lambda_symbol() {
        assert_eq!(
            read("\\ {x} {x}").unwrap(),
            Value::SExpr(vec![
                sym("\\"),
                Value::QExpr(vec![sym("x")]),
                Value::QExpr(vec![sym("x")]),
            ]),
        );
    }

    #[test]
    fn unbalanced_brackets() {
        assert_eq!(read("(+ 1 2").unwrap_err().to_string(), "unmatched '(' at 1:1");
        assert_eq!(read("+ 1 2)").unwrap_err().to_string(), "unmatched ')' at 1:6");
        assert_eq!(read("{1 2)").unwrap_err().to_string(), "expected '}', found ')' at 1:5");
    }

    #[test]
    fn nesting_limit() {
        let limit = Reader::MAX_DEPTH;
        let deepest = format!("{}{}", "(".repeat(limit), ")".repeat(limit));
        assert!(read(&deepest).is_ok());

        let too_deep = format!("{}{}", "{".repeat(limit + 1), "}".repeat(limit + 1));
        let err = read(&too_deep).unwrap_err();
        assert_eq!(err.message(), "nesting deeper than 512 brackets");
        assert_eq!(err.position(), (1, limit + 1));

        let unclosed = "(".repeat(200_000);
        assert!(read(&unclosed).is_err());
    }

    #[test]
    fn rejects_unknown_chars() {
        let err = read("+ 1 $").unwrap_err();
        assert_eq!(err.message(), "unexpected char '$'");
        assert_eq!(err.position(), (1, 5));
    }

    #[test]
    fn rejects_oversized_numbers() {
        let err = read("99999999999999999999").unwrap_err();
        assert_eq!(err.message(), "invalid number '99999999999999999999'");
    }
}
