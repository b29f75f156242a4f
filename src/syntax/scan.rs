//! Classifies identifier occurrences inside a method body.
//!
//! The scan is purely syntactic. It tells a reference to `Name` apart from a
//! declaration of a local called `Name`, from `other.Name`, from a named
//! argument `Name:` and from an object-initializer member `Name =`. A local
//! hides a member only inside the block, statement or lambda it is declared
//! in.

use super::token::{generic_close, generic_open, matching_close, matching_open, Token, TokenKind};
use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Reserved words and the contextual keywords that never name a member in
/// the positions the scanner inspects.
pub static KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
        "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
        "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
        "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
        "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
        "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
        "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
        "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
        "void", "volatile", "while", "var", "nameof", "await", "async", "yield", "when", "and",
        "or", "not", "with", "select", "where", "from", "let", "join", "into", "orderby", "group",
        "by", "on", "equals", "ascending", "descending", "global", "dynamic", "nint", "nuint",
        "scoped",
    ]
    .into_iter()
    .collect()
});

const TYPE_KEYWORDS: &[&str] = &[
    "bool", "byte", "char", "decimal", "double", "float", "int", "long", "object", "sbyte",
    "short", "string", "uint", "ulong", "ushort", "var", "dynamic", "nint", "nuint",
];

const QUERY_BINDERS: &[&str] = &["from", "let", "join", "into"];

/// Statements whose parenthesized header declares variables scoped to the
/// statement itself.
const SCOPED_HEADERS: &[&str] = &["for", "foreach", "while", "using", "fixed", "catch"];

pub const ASSIGNMENT_OPERATORS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "??=", "<<=",
];

pub fn is_keyword(token: &Token) -> bool {
    token.is_ident() && !token.text.starts_with('@') && KEYWORDS.contains(&token.text.as_str())
}

pub fn is_member_operator(token: &Token) -> bool {
    token.is(".") || token.is("?.") || token.is("->") || token.is("::")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OccurrenceKind {
    /// An unqualified name: `Total`, `Helper(x)`.
    SimpleName,
    /// The member in `this.Name`.
    ThisMember,
    /// The member in `base.Name`.
    BaseMember,
    /// `this` used as a value rather than to access a member.
    Receiver,
    /// A local, loop variable, pattern variable or lambda parameter.
    Declaration,
    NamedArgument,
    /// `Name` in `new T { Name = ... }`, `with { Name = ... }` or a
    /// property pattern.
    InitializerMember,
    /// The member in `other.Name`.
    MemberAccess,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// Index of the identifier in the scanned token slice.
    pub index: usize,
    pub kind: OccurrenceKind,
    pub name: String,
    pub invoked: bool,
    pub written: bool,
    /// Index of the `>` closing explicit type arguments on an invocation.
    pub type_args_end: Option<usize>,
    /// Set when a local declared in an enclosing scope owns the name here.
    pub local: bool,
}

/// Tokens `[start, end)` where the local `name` is visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalScope {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyScan {
    pub occurrences: Vec<Occurrence>,
    /// Every name declared as a local anywhere in the body.
    pub locals: BTreeSet<String>,
    pub scopes: Vec<LocalScope>,
}

impl BodyScan {
    /// Whether `name` at token `index` refers to a local.
    pub fn is_local_at(&self, name: &str, index: usize) -> bool {
        self.scopes
            .iter()
            .any(|s| s.name == name && s.start <= index && index < s.end)
    }

    /// Unqualified names that don't resolve to a local.
    pub fn free_names(&self) -> impl Iterator<Item = &Occurrence> {
        self.occurrences
            .iter()
            .filter(|o| o.kind == OccurrenceKind::SimpleName && !o.local)
    }

    pub fn of_kind(&self, kind: OccurrenceKind) -> impl Iterator<Item = &Occurrence> {
        self.occurrences.iter().filter(move |o| o.kind == kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    Paren,
    Bracket,
    Block,
    Initializer,
    SwitchArms,
    Pattern,
}

pub fn scan(tokens: &[Token]) -> BodyScan {
    let nesting = enclosing_groups(tokens);
    let enclosing: Vec<Option<Group>> = nesting.iter().map(|n| n.map(|(_, g)| g)).collect();
    let declared = declarations(tokens, &nesting);
    let mut result = BodyScan::default();
    let mut scoped: Vec<(&usize, &(usize, usize))> = declared.iter().collect();
    scoped.sort_unstable();
    result.scopes = scoped
        .into_iter()
        .map(|(&index, &(start, end))| LocalScope {
            name: tokens[index].ident_name().to_string(),
            start,
            end,
        })
        .collect();

    for (i, token) in tokens.iter().enumerate() {
        if !token.is_ident() {
            continue;
        }
        if token.is("this") {
            let accessed = tokens.get(i + 1).is_some_and(|n| n.is(".") || n.is("?."));
            if !accessed {
                result.occurrences.push(Occurrence {
                    index: i,
                    kind: OccurrenceKind::Receiver,
                    name: "this".to_string(),
                    invoked: false,
                    written: false,
                    type_args_end: None,
                    local: false,
                });
            }
            continue;
        }
        if is_keyword(token) {
            continue;
        }

        let prev = i.checked_sub(1).map(|p| &tokens[p]);
        let next = tokens.get(i + 1);
        let after_separator = prev.is_some_and(|p| p.is("{") || p.is(","));
        let kind = if prev.is_some_and(is_member_operator) {
            match i.checked_sub(2).map(|p| &tokens[p]) {
                Some(t) if t.is("this") => OccurrenceKind::ThisMember,
                Some(t) if t.is("base") => OccurrenceKind::BaseMember,
                _ => OccurrenceKind::MemberAccess,
            }
        } else if declared.contains_key(&i) {
            OccurrenceKind::Declaration
        } else if next.is_some_and(|n| n.is(":"))
            && prev.is_some_and(|p| p.is("(") || p.is(","))
            && enclosing[i] == Some(Group::Paren)
        {
            OccurrenceKind::NamedArgument
        } else if after_separator
            && ((enclosing[i] == Some(Group::Initializer) && next.is_some_and(|n| n.is("=")))
                || (enclosing[i] == Some(Group::Pattern) && next.is_some_and(|n| n.is(":"))))
        {
            OccurrenceKind::InitializerMember
        } else {
            OccurrenceKind::SimpleName
        };

        let type_args_end = next
            .filter(|n| n.is("<"))
            .and_then(|_| generic_close(tokens, i + 1))
            .filter(|close| tokens.get(close + 1).is_some_and(|t| t.is("(")));
        let invoked = next.is_some_and(|n| n.is("(")) || type_args_end.is_some();

        let start = match kind {
            OccurrenceKind::ThisMember | OccurrenceKind::BaseMember => i - 2,
            _ => i,
        };
        let written = next.is_some_and(|n| {
            ASSIGNMENT_OPERATORS.contains(&n.text.as_str()) || n.is("++") || n.is("--")
        }) || start
            .checked_sub(1)
            .map(|p| &tokens[p])
            .is_some_and(|p| p.is("++") || p.is("--") || p.is("ref") || p.is("out"));
        let written = written
            && matches!(
                kind,
                OccurrenceKind::SimpleName | OccurrenceKind::ThisMember | OccurrenceKind::BaseMember
            );

        let name = token.ident_name().to_string();
        let local = match kind {
            OccurrenceKind::Declaration => {
                result.locals.insert(name.clone());
                true
            }
            OccurrenceKind::SimpleName => result.is_local_at(&name, i),
            _ => false,
        };
        result.occurrences.push(Occurrence {
            index: i,
            kind,
            name,
            invoked,
            written,
            type_args_end,
            local,
        });
    }
    result
}

/// The innermost group around each token, with the index of its opener.
fn enclosing_groups(tokens: &[Token]) -> Vec<Option<(usize, Group)>> {
    let mut stack: Vec<(usize, Group)> = Vec::new();
    let mut out = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        if token.kind.is_close() {
            stack.pop();
        }
        out.push(stack.last().copied());
        if token.kind.is_open() {
            let outer = stack.last().map(|(_, group)| *group);
            stack.push((i, classify_group(tokens, i, outer)));
        }
    }
    out
}

fn classify_group(tokens: &[Token], open: usize, outer: Option<Group>) -> Group {
    match tokens[open].kind {
        TokenKind::OpenParen => return Group::Paren,
        TokenKind::OpenBracket => return Group::Bracket,
        _ => {}
    }
    let Some(prev_index) = open.checked_sub(1) else {
        return Group::Block;
    };
    let prev = &tokens[prev_index];
    if prev.is("switch") {
        return Group::SwitchArms;
    }
    if prev.is("with") {
        return Group::Initializer;
    }
    if ["is", ":", "case", "not", "and", "or"].iter().any(|k| prev.is(k))
        || (outer == Some(Group::SwitchArms) && (prev.is("{") || prev.is(",")))
    {
        return Group::Pattern;
    }

    // `new T(...) {`, `new T {`, `new {`, `new[] {`
    let mut j = prev_index;
    loop {
        let token = &tokens[j];
        if token.is("new") {
            return Group::Initializer;
        }
        let type_part = (token.is_ident() && (!is_keyword(token) || TYPE_KEYWORDS.contains(&token.text.as_str())))
            || [".", "<", ">", ",", "?", "::"].iter().any(|p| token.is(p));
        if token.kind.is_close() && j == prev_index || token.kind == TokenKind::CloseBracket {
            match matching_open(tokens, j) {
                Some(o) => j = o,
                None => return Group::Block,
            }
        } else if !type_part {
            return Group::Block;
        }
        if j == 0 {
            return Group::Block;
        }
        j -= 1;
    }
}

fn ends_declarator(token: Option<&Token>) -> bool {
    token.is_some_and(|t| ["=", ";", ",", ")", "in"].iter().any(|s| t.is(s)))
}

/// Declared locals by token index, each with the tokens it is visible in.
fn declarations(tokens: &[Token], nesting: &[Option<(usize, Group)>]) -> HashMap<usize, (usize, usize)> {
    let group = |i: usize| nesting[i].map(|(_, g)| g);
    let mut declared = HashMap::new();
    for (i, token) in tokens.iter().enumerate() {
        if token.is("=>") && i > 0 {
            let body_end = expression_end(tokens, i + 1);
            let prev = &tokens[i - 1];
            if prev.is(")") {
                if let Some(open) = matching_open(tokens, i - 1) {
                    let called = open
                        .checked_sub(1)
                        .is_some_and(|p| tokens[p].is_ident() && !tokens[p].is("async"));
                    if !called && group(open) != Some(Group::SwitchArms) {
                        for param in lambda_parameters(tokens, open, i - 1) {
                            declared.insert(param, (param, body_end));
                        }
                    }
                }
            } else if prev.is_ident()
                && !is_keyword(prev)
                && group(i - 1) != Some(Group::SwitchArms)
                && !(i >= 2 && is_member_operator(&tokens[i - 2]))
            {
                declared.insert(i - 1, (i - 1, body_end));
            }
            continue;
        }
        if token.is("var") && tokens.get(i + 1).is_some_and(|n| n.is("(")) {
            if let Some(close) = matching_close(tokens, i + 1) {
                for j in i + 2..close {
                    if tokens[j].is_ident()
                        && !is_keyword(&tokens[j])
                        && (tokens[j + 1].is(",") || tokens[j + 1].is(")"))
                    {
                        declared.insert(j, local_scope(tokens, nesting, j));
                    }
                }
            }
            continue;
        }
        if !token.is_ident() || is_keyword(token) || i == 0 {
            continue;
        }
        let prev = &tokens[i - 1];
        if QUERY_BINDERS.contains(&prev.text.as_str()) && prev.is_ident() {
            declared.insert(i, (i, expression_end(tokens, i)));
            continue;
        }
        let type_before = prev.is_ident()
            && (!is_keyword(prev) || TYPE_KEYWORDS.contains(&prev.text.as_str()));
        let next = tokens.get(i + 1);
        let closed_type = ends_declarator(next)
            && ((prev.is(">") && generic_open(tokens, i - 1).is_some())
                || (prev.is("]") && is_rank_specifier(tokens, i - 1))
                || (prev.is("?")
                    && i >= 2
                    && (tokens[i - 2].is_ident() || tokens[i - 2].is(">"))
                    && !next.is_some_and(|n| n.is(":"))));
        if type_before || closed_type {
            declared.insert(i, local_scope(tokens, nesting, i));
        }
    }
    declared
}

fn lambda_parameters(tokens: &[Token], open: usize, close: usize) -> Vec<usize> {
    let mut params = Vec::new();
    let mut last_ident: Option<usize> = None;
    let mut depth = 0usize;
    for j in open + 1..close {
        let token = &tokens[j];
        if token.kind.is_open() {
            depth += 1;
        } else if token.kind.is_close() {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && token.is(",") {
            params.extend(last_ident.take());
        } else if depth == 0 && token.is_ident() && !is_keyword(token) {
            last_ident = Some(j);
        }
    }
    params.extend(last_ident);
    params
}

/// Where a local declared at `index` is visible: the statement whose header
/// declares it, otherwise the rest of the enclosing block.
fn local_scope(tokens: &[Token], nesting: &[Option<(usize, Group)>], index: usize) -> (usize, usize) {
    let mut around = nesting[index];
    while let Some((open, group)) = around {
        match group {
            Group::Paren
                if open
                    .checked_sub(1)
                    .is_some_and(|p| SCOPED_HEADERS.iter().any(|h| tokens[p].is(h))) =>
            {
                let close = matching_close(tokens, open).unwrap_or(tokens.len());
                return (index, statement_end(tokens, close + 1));
            }
            Group::Block => {
                return (index, matching_close(tokens, open).unwrap_or(tokens.len()));
            }
            _ => around = nesting[open],
        }
    }
    (index, tokens.len())
}

/// End of the expression starting at `start`: the first `,` or `;` outside
/// nested groups, or the close of the group around it.
fn expression_end(tokens: &[Token], start: usize) -> usize {
    let mut depth = 0usize;
    for (j, token) in tokens.iter().enumerate().skip(start) {
        if token.kind.is_open() {
            depth += 1;
        } else if token.kind.is_close() {
            if depth == 0 {
                return j;
            }
            depth -= 1;
        } else if depth == 0 && (token.is(",") || token.is(";")) {
            return j;
        }
    }
    tokens.len()
}

/// End (exclusive) of the embedded statement starting at `start`.
fn statement_end(tokens: &[Token], start: usize) -> usize {
    let mut depth = 0usize;
    for (j, token) in tokens.iter().enumerate().skip(start) {
        if token.kind.is_open() {
            depth += 1;
        } else if token.kind.is_close() {
            if depth == 0 {
                return j;
            }
            depth -= 1;
            let continues = tokens
                .get(j + 1)
                .is_some_and(|n| ["else", "catch", "finally", "while"].iter().any(|k| n.is(k)));
            if depth == 0 && token.is("}") && !continues {
                return j + 1;
            }
        } else if depth == 0 && token.is(";") {
            return j + 1;
        }
    }
    tokens.len()
}

/// `[]` or `[,]` closed at `close`.
fn is_rank_specifier(tokens: &[Token], close: usize) -> bool {
    matching_open(tokens, close).is_some_and(|open| {
        tokens[open + 1..close].iter().all(|t| t.is(","))
            && open > 0
            && (tokens[open - 1].is_ident() || tokens[open - 1].is(">") || tokens[open - 1].is("?"))
    })
}
