//! Lexer for the predicate language. Tokens keep their byte span in the source text
//! so that rewrites can splice identifiers without re-printing the predicate.

use std::ops::Range;

use super::ExprError;

/// Reserved words of the predicate language.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    /// `and`
    And,
    /// `or`
    Or,
    /// `not`
    Not,
    /// `True`
    True,
    /// `False`
    False,
}

impl Keyword {
    /// Words that cannot be used as attribute or relation names.
    pub const RESERVED: [&'static str; 5] = ["and", "or", "not", "True", "False"];

    fn from_word(word: &str) -> Option<Self> {
        match word {
            "and" => Some(Keyword::And),
            "or" => Some(Keyword::Or),
            "not" => Some(Keyword::Not),
            "True" => Some(Keyword::True),
            "False" => Some(Keyword::False),
            _ => None,
        }
    }
}

/// Punctuation and operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Symbol {
    /// `==` or `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `//`
    SlashSlash,
    /// `%`
    Percent,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `.`
    Dot,
}

/// Token payload.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    /// Attribute name or field name.
    Ident(String),
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
    /// Quoted string literal with escapes resolved.
    Str(String),
    /// Reserved word.
    Keyword(Keyword),
    /// Operator or punctuation.
    Symbol(Symbol),
}

/// A token and the byte range it covers.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    /// Payload.
    pub kind: TokenKind,
    /// Byte range in the source text.
    pub span: Range<usize>,
}

impl Token {
    pub(crate) fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    pub(crate) fn is_symbol(&self, symbol: Symbol) -> bool {
        self.kind == TokenKind::Symbol(symbol)
    }

    pub(crate) fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Ident(name) => format!("identifier '{name}'"),
            TokenKind::Int(v) => format!("number {v}"),
            TokenKind::Float(v) => format!("number {v}"),
            TokenKind::Str(s) => format!("string '{s}'"),
            TokenKind::Keyword(k) => format!("keyword {k:?}"),
            TokenKind::Symbol(s) => format!("{s:?}"),
        }
    }
}

/// Splits predicate text into tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let ch = match source[pos..].chars().next() {
            Some(ch) => ch,
            None => break,
        };
        if ch.is_whitespace() {
            pos += ch.len_utf8();
            continue;
        }
        let start = pos;
        let kind = match ch {
            'A'..='Z' | 'a'..='z' | '_' => {
                while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                let word = &source[start..pos];
                match Keyword::from_word(word) {
                    Some(keyword) => TokenKind::Keyword(keyword),
                    None => TokenKind::Ident(word.to_owned()),
                }
            }
            '0'..='9' => {
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
                let fractional = pos + 1 < bytes.len()
                    && bytes[pos] == b'.'
                    && bytes[pos + 1].is_ascii_digit();
                if fractional {
                    pos += 1;
                    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                        pos += 1;
                    }
                    let text = &source[start..pos];
                    TokenKind::Float(text.parse().map_err(|_| ExprError::BadNumber(text.into()))?)
                } else {
                    let text = &source[start..pos];
                    TokenKind::Int(text.parse().map_err(|_| ExprError::BadNumber(text.into()))?)
                }
            }
            '\'' | '"' => {
                let (literal, end) = read_string(source, start, ch)?;
                pos = end;
                TokenKind::Str(literal)
            }
            _ => {
                let next = bytes.get(pos + 1).copied();
                let (symbol, width) = match (ch, next) {
                    ('=', Some(b'=')) => (Symbol::Eq, 2),
                    ('=', _) => (Symbol::Eq, 1),
                    ('!', Some(b'=')) => (Symbol::Ne, 2),
                    ('<', Some(b'=')) => (Symbol::Le, 2),
                    ('<', _) => (Symbol::Lt, 1),
                    ('>', Some(b'=')) => (Symbol::Ge, 2),
                    ('>', _) => (Symbol::Gt, 1),
                    ('+', _) => (Symbol::Plus, 1),
                    ('-', _) => (Symbol::Minus, 1),
                    ('*', _) => (Symbol::Star, 1),
                    ('/', Some(b'/')) => (Symbol::SlashSlash, 2),
                    ('/', _) => (Symbol::Slash, 1),
                    ('%', _) => (Symbol::Percent, 1),
                    ('(', _) => (Symbol::LParen, 1),
                    (')', _) => (Symbol::RParen, 1),
                    ('.', _) => (Symbol::Dot, 1),
                    _ => return Err(ExprError::UnexpectedChar { ch, offset: start }),
                };
                pos += width;
                TokenKind::Symbol(symbol)
            }
        };
        tokens.push(Token {
            kind,
            span: start..pos,
        });
    }
    Ok(tokens)
}

/// Reads a quoted literal starting at `start`; returns the unescaped text and the
/// byte offset just past the closing quote.
fn read_string(source: &str, start: usize, quote: char) -> Result<(String, usize), ExprError> {
    let mut out = String::new();
    let mut chars = source[start + 1..].char_indices();
    while let Some((offset, ch)) = chars.next() {
        match ch {
            '\\' => {
                let (_, escaped) = chars
                    .next()
                    .ok_or(ExprError::UnterminatedString(start))?;
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                });
            }
            c if c == quote => return Ok((out, start + 1 + offset + c.len_utf8())),
            c => out.push(c),
        }
    }
    Err(ExprError::UnterminatedString(start))
}
