//! Lossless tokens.
//!
//! Every token owns the trivia (whitespace, comments, preprocessor lines)
//! that precedes it, so concatenating `leading + text` for every token and
//! appending the end-of-file trivia reproduces the original source exactly.

use serde::Serialize;
use std::fmt;

/// Coarse token classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    Ident,
    Number,
    /// A string or char literal, or a literal fragment of an interpolated string.
    Str,
    Punct,
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
}

impl TokenKind {
    pub fn is_open(self) -> bool {
        matches!(
            self,
            TokenKind::OpenParen | TokenKind::OpenBrace | TokenKind::OpenBracket
        )
    }

    pub fn is_close(self) -> bool {
        matches!(
            self,
            TokenKind::CloseParen | TokenKind::CloseBrace | TokenKind::CloseBracket
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub leading: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            leading: String::new(),
        }
    }

    pub fn ident(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Ident, text)
    }

    /// Builds a punctuation or delimiter token, picking the delimiter kind
    /// from the text.
    pub fn punct(text: &str) -> Self {
        let kind = match text {
            "(" => TokenKind::OpenParen,
            ")" => TokenKind::CloseParen,
            "{" => TokenKind::OpenBrace,
            "}" => TokenKind::CloseBrace,
            "[" => TokenKind::OpenBracket,
            "]" => TokenKind::CloseBracket,
            _ => TokenKind::Punct,
        };
        Self::new(kind, text)
    }

    pub fn with_leading(mut self, leading: impl Into<String>) -> Self {
        self.leading = leading.into();
        self
    }

    pub fn is(&self, text: &str) -> bool {
        self.kind != TokenKind::Str && self.text == text
    }

    pub fn is_ident(&self) -> bool {
        self.kind == TokenKind::Ident
    }

    /// The identifier without a verbatim `@` prefix.
    pub fn ident_name(&self) -> &str {
        self.text.strip_prefix('@').unwrap_or(&self.text)
    }

    pub fn starts_line(&self) -> bool {
        self.leading.contains('\n')
    }

    pub fn write_to(&self, out: &mut String) {
        out.push_str(&self.leading);
        out.push_str(&self.text);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.leading, self.text)
    }
}

/// Renders a token run, including the trivia of its first token.
pub fn render(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        token.write_to(&mut out);
    }
    out
}

/// Renders a token run with the first token's trivia dropped and all other
/// trivia collapsed to single spaces. Used for comparisons and messages.
pub fn compact(tokens: &[Token]) -> String {
    let mut out = String::new();
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 && !token.leading.is_empty() {
            out.push(' ');
        }
        out.push_str(&token.text);
    }
    out
}

/// Index of the delimiter closing the group opened at `open`.
pub fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        if token.kind.is_open() {
            depth += 1;
        } else if token.kind.is_close() {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Index of the delimiter opening the group closed at `close`.
pub fn matching_open(tokens: &[Token], close: usize) -> Option<usize> {
    let mut depth = 0usize;
    for i in (0..=close).rev() {
        let kind = tokens[i].kind;
        if kind.is_close() {
            depth += 1;
        } else if kind.is_open() {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Index of the `<` matching a generic `>` at `close`, when everything in
/// between looks like a type argument list.
pub fn generic_open(tokens: &[Token], close: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = close;
    loop {
        let token = &tokens[i];
        if token.is(">") {
            depth += 1;
        } else if token.is("<") {
            depth -= 1;
            if depth == 0 {
                return (i > 0 && tokens[i - 1].is_ident()).then_some(i);
            }
        } else if token.kind == TokenKind::CloseBracket {
            i = matching_open(tokens, i)?;
        } else if token.kind == TokenKind::CloseParen {
            // tuple element types: `List<(int, string)>`
            i = matching_open(tokens, i)?;
        } else if !(token.is_ident() || token.is(",") || token.is(".") || token.is("?")
            || token.is("::"))
        {
            return None;
        }
        if i == 0 {
            return None;
        }
        i -= 1;
    }
}

/// Index of the `>` closing a type argument list opened by the `<` at `open`.
pub fn generic_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < tokens.len() {
        let token = &tokens[i];
        if token.is("<") {
            depth += 1;
        } else if token.is(">") {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        } else if matches!(token.kind, TokenKind::OpenBracket | TokenKind::OpenParen) {
            i = matching_close(tokens, i)?;
        } else if !(token.is_ident() || token.is(",") || token.is(".") || token.is("?")
            || token.is("::"))
        {
            return None;
        }
        i += 1;
    }
    None
}

/// Moves the trivia of `tokens[0]` onto a new token placed in front of it.
pub fn prepend_preserving_trivia(tokens: &mut Vec<Token>, mut token: Token, separator: &str) {
    if let Some(first) = tokens.first_mut() {
        token.leading = std::mem::replace(&mut first.leading, separator.to_string());
    }
    tokens.insert(0, token);
}
