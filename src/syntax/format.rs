//! Member-level layout normalization.
//!
//! Members that already sit at the indentation their nesting depth calls
//! for are left alone apart from trailing-whitespace trimming. Generated
//! members (no line break in their leading trivia) and members moved in from
//! another depth are re-indented as a block, keeping their internal relative
//! indentation. Types written on a single line stay that way until a
//! generated or moved member lands in them.

use super::token::{Token, TokenKind};
use super::tree::{CompilationUnit, Item, Member, NamespaceDecl, TypeBody, TypeDecl};
use im::Vector;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    /// One level of indentation, e.g. four spaces or a tab.
    pub indent: String,
    pub blank_line_between_members: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent: "    ".to_string(),
            blank_line_between_members: true,
        }
    }
}

/// Guesses the indentation unit of a document: a tab when lines are
/// tab-indented, otherwise the smallest non-zero run of leading spaces.
pub fn detect_indent(source: &str) -> String {
    let mut smallest: Option<usize> = None;
    for line in source.lines() {
        let ws: String = line.chars().take_while(|c| *c == ' ' || *c == '\t').collect();
        let rest = &line[ws.len()..];
        if ws.is_empty() || rest.is_empty() || rest.starts_with('*') {
            continue;
        }
        if ws.starts_with('\t') {
            return "\t".to_string();
        }
        smallest = Some(smallest.map_or(ws.len(), |s| s.min(ws.len())));
    }
    " ".repeat(smallest.unwrap_or(4))
}

/// Indentation of the line a token starts, when it starts one.
pub fn line_indent(leading: &str) -> Option<String> {
    let (_, last) = leading.rsplit_once('\n')?;
    last.chars()
        .all(|c| c == ' ' || c == '\t')
        .then(|| last.to_string())
}

pub fn format_unit(unit: &CompilationUnit, options: &FormatOptions) -> CompilationUnit {
    let items = format_items(&unit.items, 0, options, true);
    let mut eof = trim_trailing_whitespace(&unit.eof);
    let trimmed = eof.trim_end_matches(['\n', '\r', ' ', '\t']).len();
    eof.truncate(trimmed);
    eof.push('\n');
    CompilationUnit { items, eof }
}

fn format_items(items: &Vector<Item>, depth: usize, options: &FormatOptions, top: bool) -> Vector<Item> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| match item {
            Item::Namespace(ns) => Item::Namespace(format_namespace(ns, depth, options)),
            Item::Type(ty) => {
                let separator = if top && index == 0 {
                    ""
                } else if index == 0 || !options.blank_line_between_members {
                    "\n"
                } else {
                    "\n\n"
                };
                Item::Type(format_type(ty, depth, options, separator))
            }
            Item::Using(using) => {
                let mut using = using.clone();
                using.tokens.iter_mut().for_each(trim_token);
                Item::Using(using)
            }
            Item::Raw(tokens) => {
                let mut tokens = tokens.clone();
                tokens.iter_mut().for_each(trim_token);
                Item::Raw(tokens)
            }
        })
        .collect()
}

fn format_namespace(ns: &NamespaceDecl, depth: usize, options: &FormatOptions) -> NamespaceDecl {
    let mut ns = ns.clone();
    ns.header.iter_mut().for_each(trim_token);
    trim_token(&mut ns.open);
    let inner = if ns.is_file_scoped() { depth } else { depth + 1 };
    ns.items = format_items(&ns.items, inner, options, false);
    if let Some(close) = ns.close.as_mut() {
        place_on_line(close, &options.indent.repeat(depth));
    }
    ns
}

fn format_type(ty: &TypeDecl, depth: usize, options: &FormatOptions, separator: &str) -> TypeDecl {
    let expected = options.indent.repeat(depth);
    let mut ty = ty.clone();
    let leading = ty.leading_trivia();
    let fresh = !leading.contains('\n');
    let base = line_indent(&leading).unwrap_or_default();
    let moved = fresh || base != expected;

    for (i, token) in ty.head_tokens_mut().into_iter().enumerate() {
        if token.kind == TokenKind::Str {
            continue;
        }
        if i == 0 && fresh {
            token.leading = if separator.is_empty() {
                String::new()
            } else {
                format!("{separator}{expected}")
            };
        } else if moved {
            token.leading = reindent(&token.leading, &base, &expected);
        } else {
            trim_token(token);
        }
    }

    if let TypeBody::Members { members, close, .. } = &mut ty.body {
        if is_single_line(members, close) {
            trim_token(close);
            return ty;
        }
        let formatted: Vector<Member> = members
            .iter()
            .enumerate()
            .map(|(index, member)| format_member(member, depth + 1, options, index == 0))
            .collect();
        if !formatted.is_empty() && !close.leading.contains('\n') {
            close.leading = format!("\n{expected}");
        } else if moved {
            place_on_line(close, &expected);
        } else {
            trim_token(close);
        }
        *members = formatted;
    }
    ty
}

/// A body written on one line, like `{ }` or `{ public int X; }`, that no
/// generated or moved member has joined.
fn is_single_line(members: &Vector<Member>, close: &Token) -> bool {
    !close.leading.contains('\n')
        && members.iter().all(|member| {
            let leading = member.leading_trivia();
            !leading.is_empty() && !leading.contains('\n')
        })
}

fn format_member(member: &Member, depth: usize, options: &FormatOptions, first: bool) -> Member {
    let separator = if first || !options.blank_line_between_members {
        "\n"
    } else {
        "\n\n"
    };
    if let Member::Type(ty) = member {
        return Member::Type(format_type(ty, depth, options, separator));
    }

    let expected = options.indent.repeat(depth);
    let mut member = member.clone();
    let leading = member.leading_trivia();
    let fresh = !leading.contains('\n');
    let base = line_indent(&leading).unwrap_or_default();
    let aligned = !fresh && base == expected;

    for (i, token) in member.tokens_mut().into_iter().enumerate() {
        if token.kind == TokenKind::Str {
            continue;
        }
        if aligned {
            trim_token(token);
        } else if i == 0 && fresh {
            token.leading = format!("{separator}{expected}");
        } else {
            token.leading = reindent(&token.leading, &base, &expected);
            if i == 0 && !first && options.blank_line_between_members && !has_blank_line(&token.leading) {
                token.leading.insert(0, '\n');
            }
        }
    }
    member
}

/// Moves every line in `trivia` from `base` indentation to `expected`. The
/// text before the first line break stays on the previous line.
fn reindent(trivia: &str, base: &str, expected: &str) -> String {
    if !trivia.contains('\n') {
        return trivia.to_string();
    }
    let mut out = String::with_capacity(trivia.len());
    let mut lines = trivia.split('\n');
    if let Some(first) = lines.next() {
        out.push_str(first.trim_end_matches([' ', '\t']));
    }
    let rest: Vec<&str> = lines.collect();
    for (i, line) in rest.iter().enumerate() {
        out.push('\n');
        let last = i + 1 == rest.len();
        let ws_len = line.len() - line.trim_start_matches([' ', '\t']).len();
        let (ws, text) = line.split_at(ws_len);
        let text = if last { text } else { text.trim_end_matches([' ', '\t']) };
        if text.is_empty() && !last {
            continue;
        }
        match ws.strip_prefix(base) {
            Some(relative) => {
                out.push_str(expected);
                out.push_str(relative);
            }
            None => out.push_str(expected),
        }
        out.push_str(text);
    }
    out
}

fn trim_trailing_whitespace(trivia: &str) -> String {
    let lines: Vec<&str> = trivia.split('\n').collect();
    let last = lines.len() - 1;
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if i == last {
                line.to_string()
            } else {
                line.trim_end_matches([' ', '\t', '\r']).to_string()
                    + if line.ends_with('\r') { "\r" } else { "" }
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn trim_token(token: &mut Token) {
    if token.kind != TokenKind::Str && token.leading.contains('\n') {
        token.leading = trim_trailing_whitespace(&token.leading);
    }
}

fn place_on_line(token: &mut Token, indent: &str) {
    match line_indent(&token.leading) {
        Some(current) if current == indent => trim_token(token),
        Some(_) => {
            let prefix = token.leading.rsplit_once('\n').map_or("", |(p, _)| p);
            token.leading = format!("{}\n{indent}", trim_trailing_whitespace(prefix));
        }
        None if token.leading.contains('\n') => trim_token(token),
        None => token.leading = format!("\n{indent}"),
    }
}

fn has_blank_line(trivia: &str) -> bool {
    let lines: Vec<&str> = trivia.split('\n').collect();
    lines.len() > 2 && lines[1..lines.len() - 1].iter().any(|line| line.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parser::{parse_compilation_unit, parse_member};
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn detects_tabs_and_spaces() {
        assert_eq!(detect_indent("class A\n{\n\tint x;\n}\n"), "\t");
        assert_eq!(detect_indent("class A\n{\n  int x;\n    int y;\n}\n"), "  ");
        assert_eq!(detect_indent("class A { }"), "    ");
    }

    #[test]
    fn reindents_generated_and_moved_members() {
        let unit = parse_compilation_unit(indoc! {"
            namespace N
            {
                class B
                {
                    int x;
                }
            }
        "})
        .unwrap();
        let ty = unit.find_type("B").unwrap();
        let generated = parse_member("public int Add(int v)\n{\n    return v;\n}", "B").unwrap();
        let moved = parse_member("\n    int Twice(int v)\n    {\n        return v * 2;\n    }", "B").unwrap();
        let mut members = ty.members();
        members.push_back(generated);
        members.push_back(moved);
        let unit = unit.replace_type(&ty, ty.with_members(members)).unwrap();

        let formatted = format_unit(&unit, &FormatOptions::default());
        assert_eq!(
            formatted.to_source(),
            indoc! {"
                namespace N
                {
                    class B
                    {
                        int x;

                        public int Add(int v)
                        {
                            return v;
                        }

                        int Twice(int v)
                        {
                            return v * 2;
                        }
                    }
                }
            "}
        );
    }

    #[test]
    fn leaves_aligned_members_untouched() {
        let source = "class A\n{\n    int x;\n    int y;\n}\n";
        let unit = parse_compilation_unit(source).unwrap();
        assert_eq!(format_unit(&unit, &FormatOptions::default()).to_source(), source);
    }

    #[test]
    fn single_line_types_keep_their_layout() {
        let source = "namespace N\n{\n    class P { public int X; }\n\n    class Q { }\n}\n";
        let unit = parse_compilation_unit(source).unwrap();
        assert_eq!(format_unit(&unit, &FormatOptions::default()).to_source(), source);
    }

    #[test]
    fn single_line_type_opens_up_for_a_generated_member() {
        let unit = parse_compilation_unit("class B { }\n").unwrap();
        let ty = unit.find_type("B").unwrap();
        let mut members = ty.members();
        members.push_back(parse_member("int F() => 1;", "B").unwrap());
        let unit = unit.replace_type(&ty, ty.with_members(members)).unwrap();
        assert_eq!(
            format_unit(&unit, &FormatOptions::default()).to_source(),
            "class B {\n    int F() => 1;\n}\n"
        );
    }

    #[test]
    fn blank_lines_are_found_between_breaks() {
        assert!(has_blank_line("\n\n    "));
        assert!(has_blank_line("\n  \n    // doc\n    "));
        assert!(!has_blank_line("\n    "));
        assert!(!has_blank_line(" "));
    }

    #[test]
    fn ensures_single_final_newline() {
        let unit = parse_compilation_unit("class A { }\n\n\n").unwrap();
        assert_eq!(format_unit(&unit, &FormatOptions::default()).to_source(), "class A { }\n");
    }
}
