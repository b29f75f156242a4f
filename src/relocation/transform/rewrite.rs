//! Non-overlapping token edits over a method body.
//!
//! Stages claim token ranges as they decide what to do with them; the first
//! claim on a token wins. All edits are applied in one pass at the end, so
//! occurrence indices from the initial scan stay valid throughout.

use crate::syntax::Token;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    /// Exclusive.
    pub end: usize,
    pub replacement: Vec<Token>,
}

#[derive(Debug, Clone, Default)]
pub struct EditSet {
    edits: Vec<Edit>,
    claimed: BTreeSet<usize>,
}

impl EditSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_claimed(&self, index: usize) -> bool {
        self.claimed.contains(&index)
    }

    /// Registers a replacement for `start..end`. Returns false, leaving the
    /// set unchanged, when any token in the range is already claimed.
    pub fn claim(&mut self, start: usize, end: usize, replacement: Vec<Token>) -> bool {
        if (start..end).any(|i| self.claimed.contains(&i)) {
            return false;
        }
        self.claimed.extend(start..end);
        self.edits.push(Edit {
            start,
            end,
            replacement,
        });
        true
    }

    /// Claims `start..end` without changing it.
    pub fn keep(&mut self, tokens: &[Token], start: usize, end: usize) -> bool {
        self.claim(start, end, tokens[start..end].to_vec())
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Applies every edit. Each replacement takes over the leading trivia of
    /// the first token it replaces.
    pub fn apply(mut self, tokens: &[Token]) -> Vec<Token> {
        self.edits.sort_by_key(|e| e.start);
        let mut out = Vec::with_capacity(tokens.len());
        let mut edits = self.edits.into_iter().peekable();
        let mut i = 0;
        while i < tokens.len() {
            match edits.next_if(|e| e.start == i) {
                Some(edit) => {
                    let mut replacement = edit.replacement;
                    if let Some(first) = replacement.first_mut() {
                        first.leading = tokens[i].leading.clone();
                    }
                    out.extend(replacement);
                    i = edit.end.max(i + 1);
                }
                None => {
                    out.push(tokens[i].clone());
                    i += 1;
                }
            }
        }
        out
    }
}

/// `qualifier.name`, keeping `name`'s spelling.
pub fn member_access(qualifier: &str, name: &Token) -> Vec<Token> {
    vec![
        Token::ident(qualifier),
        Token::punct("."),
        Token::new(name.kind, name.text.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lexer::tokenize;
    use crate::syntax::token::render;

    #[test]
    fn applies_claims_and_keeps_trivia() {
        let (tokens, _) = tokenize("{ total += val; return this; }").unwrap();
        let mut edits = EditSet::new();
        assert!(edits.claim(1, 2, vec![Token::ident("total")]));
        assert!(!edits.claim(1, 2, vec![Token::ident("other")]));
        assert!(edits.claim(6, 7, vec![Token::ident("@this")]));
        assert!(edits.claim(3, 4, member_access("@this", &tokens[3])));
        assert_eq!(edits.len(), 3);
        assert_eq!(
            render(&edits.apply(&tokens)),
            "{ total += @this.val; return @this; }"
        );
    }
}
