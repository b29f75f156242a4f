//! Tokenizer for the C# subset understood by the relocation engine.
//!
//! The lexer is lossless: whitespace, comments and preprocessor lines are
//! kept as leading trivia on the following token. Interpolated strings are
//! split into literal fragments and ordinary tokens for each hole, so member
//! references inside `$"{Value}"` are visible to analysis and rewriting.

use super::token::{Token, TokenKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {line}:{column}")]
pub struct LexError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Multi-character operators, longest first. `>` is never combined with a
/// following `>` so that nested generic argument lists close one level per
/// token.
const OPERATORS: &[&str] = &[
    "??=", "<<=", "...", "=>", "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=",
    "*=", "/=", "%=", "&=", "|=", "^=", "??", "?.", "::", "->", "<<", "..",
];

/// Tokenizes `source`, returning the tokens and the trailing trivia.
pub fn tokenize(source: &str) -> Result<(Vec<Token>, String), LexError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let trivia = lexer.trivia()?;
        if lexer.at_end() {
            return Ok((tokens, trivia));
        }
        lexer.token(trivia, &mut tokens)?;
    }
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn starts_with(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        let consumed = &self.chars[..self.pos.min(self.chars.len())];
        let line = consumed.iter().filter(|c| **c == '\n').count() + 1;
        let column = consumed.iter().rev().take_while(|c| **c != '\n').count() + 1;
        LexError {
            line,
            column,
            message: message.into(),
        }
    }

    fn slice(&self, start: usize) -> String {
        self.chars[start..self.pos].iter().collect()
    }

    fn at_line_start(&self) -> bool {
        self.chars[..self.pos]
            .iter()
            .rev()
            .take_while(|c| **c != '\n')
            .all(|c| c.is_whitespace())
    }

    fn trivia(&mut self) -> Result<String, LexError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
            } else if self.starts_with("//") {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.pos += 1;
                }
            } else if self.starts_with("/*") {
                self.pos += 2;
                while !self.starts_with("*/") {
                    if self.at_end() {
                        return Err(self.error("unterminated block comment"));
                    }
                    self.pos += 1;
                }
                self.pos += 2;
            } else if c == '#' && self.at_line_start() {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
        Ok(self.slice(start))
    }

    fn token(&mut self, leading: String, out: &mut Vec<Token>) -> Result<(), LexError> {
        let c = self.peek().unwrap_or_default();
        if self.starts_with("$@\"") || self.starts_with("@$\"") {
            return self.interpolated(leading, 3, true, out);
        }
        if self.starts_with("$\"\"\"") {
            let token = self.raw_string(3)?;
            out.push(token.with_leading(leading));
            return Ok(());
        }
        if self.starts_with("$\"") {
            return self.interpolated(leading, 2, false, out);
        }
        let token = if self.starts_with("\"\"\"") {
            self.raw_string(0)?
        } else if self.starts_with("@\"") {
            self.verbatim_string()?
        } else if c == '"' {
            self.quoted('"')?
        } else if c == '\'' {
            self.quoted('\'')?
        } else if c == '@' || c == '_' || c.is_alphabetic() {
            self.identifier()
        } else if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit())) {
            self.number()
        } else {
            self.operator()
        };
        out.push(token.with_leading(leading));
        Ok(())
    }

    fn identifier(&mut self) -> Token {
        let start = self.pos;
        if self.peek() == Some('@') {
            self.pos += 1;
        }
        while self.peek().is_some_and(|c| c == '_' || c.is_alphanumeric()) {
            self.pos += 1;
        }
        Token::new(TokenKind::Ident, self.slice(start))
    }

    fn number(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek() {
            let exponent_sign = (c == '+' || c == '-')
                && self.pos > start
                && matches!(self.chars[self.pos - 1], 'e' | 'E')
                && !self.slice(start).starts_with("0x");
            let decimal_point = c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit());
            if c.is_alphanumeric() || c == '_' || decimal_point || exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }
        Token::new(TokenKind::Number, self.slice(start))
    }

    fn operator(&mut self) -> Token {
        for op in OPERATORS {
            if self.starts_with(op) {
                self.pos += op.chars().count();
                return Token::new(TokenKind::Punct, *op);
            }
        }
        let c = self.peek().unwrap_or_default();
        self.pos += 1;
        Token::punct(&c.to_string())
    }

    fn quoted(&mut self, quote: char) -> Result<Token, LexError> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek() {
                None | Some('\n') => return Err(self.error("unterminated literal")),
                Some('\\') => self.pos += 2,
                Some(c) if c == quote => {
                    self.pos += 1;
                    break;
                }
                Some(_) => self.pos += 1,
            }
        }
        Ok(Token::new(TokenKind::Str, self.slice(start)))
    }

    fn verbatim_string(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        self.pos += 2;
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated verbatim string")),
                Some('"') if self.peek_at(1) == Some('"') => self.pos += 2,
                Some('"') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => self.pos += 1,
            }
        }
        Ok(Token::new(TokenKind::Str, self.slice(start)))
    }

    /// Raw string literal; `prefix` counts `$` characters before the quotes.
    fn raw_string(&mut self, prefix: usize) -> Result<Token, LexError> {
        let start = self.pos;
        self.pos += prefix.min(1);
        let mut quotes = 0;
        while self.peek() == Some('"') {
            quotes += 1;
            self.pos += 1;
        }
        let closing: String = "\"".repeat(quotes);
        while !self.starts_with(&closing) {
            if self.at_end() {
                return Err(self.error("unterminated raw string"));
            }
            self.pos += 1;
        }
        self.pos += quotes;
        Ok(Token::new(TokenKind::Str, self.slice(start)))
    }

    /// Splits an interpolated string into literal fragments and hole tokens.
    fn interpolated(
        &mut self,
        leading: String,
        prefix_len: usize,
        verbatim: bool,
        out: &mut Vec<Token>,
    ) -> Result<(), LexError> {
        let mut fragment_start = self.pos;
        let mut fragment_leading = leading;
        self.pos += prefix_len;
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated interpolated string")),
                Some('\n') if !verbatim => {
                    return Err(self.error("newline in interpolated string"))
                }
                Some('\\') if !verbatim => self.pos += 2,
                Some('"') if verbatim && self.peek_at(1) == Some('"') => self.pos += 2,
                Some('"') => {
                    self.pos += 1;
                    out.push(
                        Token::new(TokenKind::Str, self.slice(fragment_start))
                            .with_leading(fragment_leading),
                    );
                    return Ok(());
                }
                Some('{') if self.peek_at(1) == Some('{') => self.pos += 2,
                Some('}') if self.peek_at(1) == Some('}') => self.pos += 2,
                Some('{') => {
                    self.pos += 1;
                    out.push(
                        Token::new(TokenKind::Str, self.slice(fragment_start))
                            .with_leading(std::mem::take(&mut fragment_leading)),
                    );
                    fragment_leading = self.hole(out)?;
                    fragment_start = self.pos;
                    // alignment and format specifiers belong to the fragment
                    if matches!(self.peek(), Some(':') | Some(',')) {
                        while self.peek().is_some_and(|c| c != '}') {
                            self.pos += 1;
                        }
                    }
                    if self.peek() != Some('}') {
                        return Err(self.error("unterminated interpolation hole"));
                    }
                    self.pos += 1;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Lexes the expression inside an interpolation hole. Returns the trivia
    /// found before the closing `}` or format specifier.
    fn hole(&mut self, out: &mut Vec<Token>) -> Result<String, LexError> {
        let mut depth = 0usize;
        loop {
            let trivia = self.trivia()?;
            match self.peek() {
                None => return Err(self.error("unterminated interpolation hole")),
                Some('}') | Some(':') | Some(',') if depth == 0 => return Ok(trivia),
                _ => {}
            }
            let before = out.len();
            self.token(trivia, out)?;
            if let Some(token) = out.get(before) {
                if token.kind.is_open() {
                    depth += 1;
                } else if token.kind.is_close() {
                    depth = depth.saturating_sub(1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::token::render;

    fn texts(source: &str) -> Vec<String> {
        tokenize(source)
            .unwrap()
            .0
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn round_trips_source_exactly() {
        let source = "// header\nclass A {\n  /* c */ int x = 1; #not-a-directive\n}\n";
        let (tokens, eof) = tokenize(source).unwrap();
        assert_eq!(render(&tokens) + &eof, source);
    }

    #[test]
    fn keeps_generic_closers_separate() {
        assert_eq!(
            texts("Dictionary<int, List<int>> m"),
            vec!["Dictionary", "<", "int", ",", "List", "<", "int", ">", ">", "m"]
        );
    }

    #[test]
    fn splits_interpolation_holes() {
        let source = r#"$"Sum {Val:N2} and {x + 1}!""#;
        let (tokens, eof) = tokenize(source).unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| (t.kind, t.text.as_str())).collect();
        assert_eq!(
            kinds,
            vec![
                (TokenKind::Str, "$\"Sum {"),
                (TokenKind::Ident, "Val"),
                (TokenKind::Str, ":N2} and {"),
                (TokenKind::Ident, "x"),
                (TokenKind::Punct, "+"),
                (TokenKind::Number, "1"),
                (TokenKind::Str, "}!\""),
            ]
        );
        assert_eq!(render(&tokens) + &eof, source);
    }

    #[test]
    fn preprocessor_lines_are_trivia() {
        let (tokens, _) = tokenize("#region X\nint a;\n#endregion\n").unwrap();
        assert_eq!(tokens[0].leading, "#region X\n");
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn verbatim_identifiers_and_strings() {
        assert_eq!(texts(r#"@this.Run(@"a""b")"#), vec!["@this", ".", "Run", "(", "@\"a\"\"b\"", ")"]);
    }

    #[test]
    fn reports_unterminated_strings() {
        let err = tokenize("var s = \"abc\n;").unwrap_err();
        assert_eq!(err.line, 1);
    }
}
