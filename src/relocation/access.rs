//! State that connects the source and target types after a move: the access
//! member on the source and constructor-injected fields on the target.

use super::request::AccessMemberKind;
use super::resolver::simple_type_name;
use super::transform::naming::{member_name_for, parameter_name_for};
use super::transform::TargetDependency;
use crate::errors::{ErrorCode, RelocationError, Result};
use crate::syntax::format::line_indent;
use crate::syntax::{
    parse_member, tokenize, ConstructorDecl, Member, MethodBody, Param, Token, TypeDecl, TypeKind,
};
use im::Vector;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

/// The source member that holds a target instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessMember {
    pub name: String,
    pub kind: AccessMemberKind,
    /// False when an existing member was reused.
    pub created: bool,
}

/// Finds or creates the access member for `target_type` on `source`.
///
/// The member is initialized inline with `new Target()` unless
/// `constructor_initialized` is set, in which case the caller initializes it
/// through [`initialize_access_member`].
pub fn ensure_access_member(
    source: &TypeDecl,
    target_type: &str,
    requested_name: Option<&str>,
    kind: AccessMemberKind,
    constructor_initialized: bool,
) -> Result<(TypeDecl, AccessMember)> {
    let state = state_members(source);
    let declared: BTreeSet<String> = source.member_names().into_iter().collect();
    let holds_target = |name: &str| {
        state
            .iter()
            .any(|(n, ty)| n == name && simple_type_name(ty) == simple_type_name(target_type))
    };

    let name = match requested_name {
        Some(name) if holds_target(name) => return Ok(reused(source, name, kind)),
        Some(name) if declared.contains(name) => {
            return Err(RelocationError::precondition(
                ErrorCode::TARGET_CONFLICT,
                format!(
                    "'{}' already declares '{name}' with a type other than '{target_type}'",
                    source.name()
                ),
            ));
        }
        Some(name) => name.to_string(),
        None => {
            let base = member_name_for(target_type);
            let mut candidate = base.clone();
            let mut suffix = 2;
            loop {
                if holds_target(&candidate) {
                    return Ok(reused(source, &candidate, kind));
                }
                if !declared.contains(&candidate) {
                    break candidate;
                }
                candidate = format!("{base}{suffix}");
                suffix += 1;
            }
        }
    };

    let initializer = if constructor_initialized {
        String::new()
    } else {
        format!(" = new {target_type}()")
    };
    let text = match kind {
        AccessMemberKind::Field => format!("private readonly {target_type} {name}{initializer};"),
        AccessMemberKind::Property if constructor_initialized => {
            format!("private {target_type} {name} {{ get; }}")
        }
        AccessMemberKind::Property => {
            format!("private {target_type} {name} {{ get; }}{initializer};")
        }
    };
    let mut member = generated_member(&text, source.name())?;

    let members = source.members();
    let position = last_position(&members, |m| matches!(m, Member::Field(_)))
        .map_or(0, |i| i + 1);
    let neighbor = position.checked_sub(1).or((!members.is_empty()).then_some(0));
    if let (Some(first), Some(neighbor)) = (member.first_token_mut(), neighbor) {
        first.leading = spacing_like(&members[neighbor]);
    }
    let mut updated = members.clone();
    updated.insert(position, member);
    debug!(member = %name, source = source.name(), "Created access member");
    Ok((
        source.with_members(updated),
        AccessMember {
            name,
            kind,
            created: true,
        },
    ))
}

fn reused(source: &TypeDecl, name: &str, kind: AccessMemberKind) -> (TypeDecl, AccessMember) {
    debug!(member = name, "Reusing access member");
    (
        source.clone(),
        AccessMember {
            name: name.to_string(),
            kind,
            created: false,
        },
    )
}

/// Sets `access` to `new Target(args)` in every instance constructor of
/// `source` that doesn't chain to another one, generating a constructor when
/// there is none. Any inline initializer on the member is dropped.
pub fn initialize_access_member(
    source: &TypeDecl,
    access: &AccessMember,
    target_type: &str,
    args: &[String],
    indent_unit: &str,
) -> Result<TypeDecl> {
    let statement = format!("{} = new {target_type}({});", access.name, args.join(", "));
    let mut members = source.members();
    let mut touched = false;

    for index in 0..members.len() {
        let updated = match &members[index] {
            Member::Field(field) if field.names.iter().any(|n| *n == access.name) => {
                let mut field = field.clone();
                field.declarators = without_initializer(&field.declarators, false);
                Some(Member::Field(field))
            }
            Member::Property(property) if property.name.ident_name() == access.name => {
                let mut property = property.clone();
                property.rest = without_initializer(&property.rest, true);
                Some(Member::Property(property))
            }
            Member::Constructor(ctor) if !ctor.is_static() && !ctor.chains_to_this() => {
                touched = true;
                Some(Member::Constructor(assign_in_constructor(
                    ctor,
                    &access.name,
                    &statement,
                    indent_unit,
                )?))
            }
            _ => None,
        };
        if let Some(member) = updated {
            members.set(index, member);
        }
    }

    if !touched {
        let text = format!(
            "public {}()\n{{\n{indent_unit}{statement}\n}}",
            source.name()
        );
        let ctor = generated_member(&text, source.name())?;
        let position = last_position(&members, |m| {
            matches!(m, Member::Field(_) | Member::Property(_) | Member::Constructor(_))
        })
        .map_or(0, |i| i + 1);
        members.insert(position, ctor);
        debug!(source = source.name(), "Generated constructor for access member");
    }
    Ok(source.with_members(members))
}

/// Adds a field and a constructor parameter for every dependency. Amends
/// the instance constructor with the fewest parameters whose parameters all
/// correspond to fields of `target`, generating one when none qualifies.
///
/// Returns the updated type and the fields its injecting constructor sets,
/// in parameter order.
pub fn inject_constructor_dependencies(
    target: &TypeDecl,
    dependencies: &[TargetDependency],
    indent_unit: &str,
) -> Result<(TypeDecl, Vec<String>)> {
    let mut members = target.members();
    let declared: BTreeSet<String> = target.member_names().into_iter().collect();

    for dependency in dependencies {
        if declared.contains(&dependency.field) {
            continue;
        }
        let text = format!("private {} {};", dependency.type_text, dependency.field);
        let position = last_position(&members, |m| matches!(m, Member::Field(_)))
            .map_or(0, |i| i + 1);
        let mut field = generated_member(&text, target.name())?;
        if let (Some(first), Some(previous)) = (field.first_token_mut(), position.checked_sub(1)) {
            first.leading = spacing_like(&members[previous]);
        }
        members.insert(position, field);
    }

    let fields: Vec<String> = state_members(&target.with_members(members.clone()))
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    let field_for = |param: &str| field_for_parameter(&fields, param);
    let candidate = injecting_constructor(&members, &fields);

    let (index, mut ctor) = match candidate {
        Some((index, ctor)) => (Some(index), ctor),
        None => {
            let text = format!("public {}()\n{{\n}}", target.name());
            match generated_member(&text, target.name())? {
                Member::Constructor(ctor) => (None, ctor),
                _ => {
                    return Err(RelocationError::precondition(
                        ErrorCode::UNSUPPORTED,
                        format!("could not generate a constructor for '{}'", target.name()),
                    ))
                }
            }
        }
    };

    let mut taken: BTreeSet<String> = ctor
        .params
        .names()
        .into_iter()
        .map(|n| n.trim_start_matches('@').to_string())
        .collect();
    for dependency in dependencies {
        let already = ctor
            .params
            .names()
            .iter()
            .any(|p| field_for(p).as_deref() == Some(dependency.field.as_str()));
        if already {
            continue;
        }
        let parameter = parameter_name_for(&dependency.field, &taken);
        taken.insert(parameter.trim_start_matches('@').to_string());
        let position = ctor.params.params.len();
        ctor.params
            .insert(position, Param::new(&dependency.type_text, &parameter));
        let statement = format!("this.{} = {parameter};", dependency.field);
        ctor = append_statement(&ctor, &statement, indent_unit)?;
    }

    let order = constructor_order(&ctor, &fields);

    match index {
        Some(index) => {
            members.set(index, Member::Constructor(ctor));
        }
        None => {
            let position = last_position(&members, |m| {
                matches!(m, Member::Field(_) | Member::Property(_) | Member::Constructor(_))
            })
            .map_or(0, |i| i + 1);
            members.insert(position, Member::Constructor(ctor));
        }
    }
    debug!(target = target.name(), fields = ?order, "Injected constructor dependencies");
    Ok((target.with_members(members), order))
}

/// Fields set by the constructor [`inject_constructor_dependencies`] would
/// amend, in parameter order. Empty when `target` has no such constructor.
pub fn constructor_fields(target: &TypeDecl) -> Vec<String> {
    let fields: Vec<String> = state_members(target).into_iter().map(|(name, _)| name).collect();
    injecting_constructor(&target.members(), &fields)
        .map(|(_, ctor)| constructor_order(&ctor, &fields))
        .unwrap_or_default()
}

/// Whether `new Target()` compiles against `target`: a struct, a type without
/// instance constructors, or one whose constructor can be called with no
/// arguments.
pub fn accepts_default_construction(target: &TypeDecl) -> bool {
    if target.kind == TypeKind::Struct {
        return true;
    }
    let mut instance = target.constructors().filter(|c| !c.is_static()).peekable();
    instance.peek().is_none() || instance.any(|c| c.params.params.iter().all(|p| p.is_optional()))
}

fn field_for_parameter(fields: &[String], param: &str) -> Option<String> {
    let param = param.trim_start_matches('@');
    fields
        .iter()
        .find(|f| parameter_name_for(f, &BTreeSet::new()).trim_start_matches('@') == param)
        .cloned()
}

/// The instance constructor with the fewest parameters whose parameters all
/// correspond to `fields`.
fn injecting_constructor(members: &Vector<Member>, fields: &[String]) -> Option<(usize, ConstructorDecl)> {
    members
        .iter()
        .enumerate()
        .filter_map(|(index, m)| match m {
            Member::Constructor(ctor) if !ctor.is_static() && !ctor.chains_to_this() => {
                Some((index, ctor.clone()))
            }
            _ => None,
        })
        .filter(|(_, ctor)| {
            ctor.params
                .names()
                .iter()
                .all(|p| field_for_parameter(fields, p).is_some())
        })
        .min_by_key(|(_, ctor)| ctor.params.params.len())
}

fn constructor_order(ctor: &ConstructorDecl, fields: &[String]) -> Vec<String> {
    ctor.params
        .names()
        .iter()
        .filter_map(|p| field_for_parameter(fields, p))
        .collect()
}

/// Field and property names with their declared type text.
fn state_members(ty: &TypeDecl) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for member in ty.members() {
        match member {
            Member::Field(field) => {
                let ty = field.type_text();
                out.extend(field.names.iter().map(|n| (n.clone(), ty.clone())));
            }
            Member::Property(property) => {
                out.push((property.name.ident_name().to_string(), property.type_text()));
            }
            _ => {}
        }
    }
    out
}

fn last_position(members: &Vector<Member>, predicate: impl Fn(&Member) -> bool) -> Option<usize> {
    members
        .iter()
        .enumerate()
        .filter(|(_, m)| predicate(m))
        .map(|(i, _)| i)
        .last()
}

/// The line breaks and indentation in front of `neighbor`, without its
/// comments. A neighbor sharing its line gets a single space. Anything else
/// comes back empty so formatting places the new member.
fn spacing_like(neighbor: &Member) -> String {
    let leading = neighbor.leading_trivia();
    let breaks = leading
        .chars()
        .take_while(|c| c.is_whitespace())
        .filter(|c| *c == '\n')
        .count();
    match line_indent(&leading) {
        Some(indent) if breaks > 0 => format!("{}{indent}", "\n".repeat(breaks.min(2))),
        None if !leading.is_empty() && !leading.contains('\n') => " ".to_string(),
        _ => String::new(),
    }
}

fn generated_member(text: &str, type_name: &str) -> Result<Member> {
    parse_member(text, type_name).map_err(|err| RelocationError::parse("<generated>", err))
}

fn generated_tokens(text: &str) -> Result<Vec<Token>> {
    tokenize(text)
        .map(|(tokens, _)| tokens)
        .map_err(|err| RelocationError::parse("<generated>", err.into()))
}

/// Drops `= value` from a field declarator list or a property tail. For a
/// property the terminating `;` goes with it.
fn without_initializer(tokens: &[Token], property: bool) -> Vec<Token> {
    let mut depth = 0i32;
    let mut start = None;
    for (i, token) in tokens.iter().enumerate() {
        if token.kind.is_open() {
            depth += 1;
        } else if token.kind.is_close() {
            depth -= 1;
        } else if depth == 0 && token.is("=") {
            start = Some(i);
            break;
        }
    }
    let Some(start) = start else {
        return tokens.to_vec();
    };
    let end = tokens
        .iter()
        .rposition(|t| t.is(";"))
        .filter(|&end| end > start)
        .unwrap_or(tokens.len());
    let mut out = tokens[..start].to_vec();
    if !property {
        out.extend(tokens[end..].iter().cloned().map(|mut t| {
            t.leading.clear();
            t
        }));
    }
    out
}

/// Replaces an existing `name = ...;` statement in `ctor`, or appends
/// `statement` when there is none.
fn assign_in_constructor(
    ctor: &ConstructorDecl,
    name: &str,
    statement: &str,
    indent_unit: &str,
) -> Result<ConstructorDecl> {
    if let MethodBody::Block(block) = &ctor.body {
        if let Some((start, end)) = find_assignment(block, name) {
            let mut replacement = generated_tokens(statement)?;
            if let Some(first) = replacement.first_mut() {
                first.leading = block[start].leading.clone();
            }
            let mut tokens = block[..start].to_vec();
            tokens.extend(replacement);
            tokens.extend_from_slice(&block[end + 1..]);
            let mut updated = ctor.clone();
            updated.body = MethodBody::Block(tokens);
            return Ok(updated);
        }
    }
    append_statement(ctor, statement, indent_unit)
}

/// Top-level statement `name = ...;` or `this.name = ...;` in a block.
/// Returns the indices of its first token and its `;`.
fn find_assignment(block: &[Token], name: &str) -> Option<(usize, usize)> {
    let mut depth = 0i32;
    let mut statement_start = true;
    for i in 0..block.len() {
        let token = &block[i];
        if depth == 1 && statement_start {
            let target = if token.is("this") && block.get(i + 1).is_some_and(|t| t.is(".")) {
                i + 2
            } else {
                i
            };
            let assigns = block.get(target).is_some_and(|t| t.is_ident() && t.ident_name() == name)
                && block.get(target + 1).is_some_and(|t| t.is("="));
            if assigns {
                let mut inner = 0i32;
                for (j, t) in block.iter().enumerate().skip(target + 1) {
                    if t.kind.is_open() {
                        inner += 1;
                    } else if t.kind.is_close() {
                        inner -= 1;
                    } else if inner == 0 && t.is(";") {
                        return Some((i, j));
                    }
                }
                return None;
            }
        }
        if token.kind.is_open() {
            depth += 1;
        } else if token.kind.is_close() {
            depth -= 1;
        }
        statement_start = token.is(";") || token.is("{") || token.is("}");
    }
    None
}

/// Appends `statement` as the last statement of a constructor body. An
/// expression-bodied constructor becomes a block.
pub(crate) fn append_statement(
    ctor: &ConstructorDecl,
    statement: &str,
    indent_unit: &str,
) -> Result<ConstructorDecl> {
    let leading = Member::Constructor(ctor.clone()).leading_trivia();
    let outer = line_indent(&leading).unwrap_or_default();
    let inner = format!("{outer}{indent_unit}");
    let mut added = generated_tokens(statement)?;
    if let Some(first) = added.first_mut() {
        first.leading = format!("\n{inner}");
    }

    let mut updated = ctor.clone();
    let tokens = match &ctor.body {
        MethodBody::Block(block) => {
            let Some((close, rest)) = block.split_last() else {
                return Ok(updated);
            };
            let mut tokens = rest.to_vec();
            tokens.extend(added);
            let mut close = close.clone();
            if !close.leading.contains('\n') {
                close.leading = format!("\n{outer}");
            }
            tokens.push(close);
            tokens
        }
        MethodBody::Arrow { expr, semi, .. } => {
            let mut tokens = vec![Token::punct("{").with_leading(format!("\n{outer}"))];
            let mut expr = expr.clone();
            if let Some(first) = expr.first_mut() {
                first.leading = format!("\n{inner}");
            }
            tokens.extend(expr);
            tokens.push(semi.clone());
            tokens.extend(added);
            tokens.push(Token::punct("}").with_leading(format!("\n{outer}")));
            tokens
        }
        MethodBody::Semicolon(_) => return Ok(updated),
    };
    updated.body = MethodBody::Block(tokens);
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_type;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn ty(source: &str) -> TypeDecl {
        parse_type(source).unwrap()
    }

    #[test]
    fn creates_field_after_existing_fields() {
        let source = ty("class A { int x; void F() { } }");
        let (updated, access) =
            ensure_access_member(&source, "B", None, AccessMemberKind::Field, false).unwrap();
        assert_eq!(access.name, "_b");
        assert!(access.created);
        let members = updated.members();
        match &members[1] {
            Member::Field(field) => {
                assert_eq!(field.names, vec!["_b".to_string()]);
                assert_eq!(field.type_text(), "B");
            }
            other => panic!("expected a field, got {other:?}"),
        }
    }

    #[test]
    fn reuses_member_of_target_type_and_suffixes_collisions() {
        let source = ty("class A { private readonly B _b = new B(); }");
        let (_, access) =
            ensure_access_member(&source, "B", None, AccessMemberKind::Field, false).unwrap();
        assert!(!access.created);

        let source = ty("class A { string _b; }");
        let (_, access) =
            ensure_access_member(&source, "B", None, AccessMemberKind::Property, false).unwrap();
        assert_eq!(access.name, "_b2");
        assert!(access.created);
    }

    #[test]
    fn explicit_name_taken_by_another_type_is_a_conflict() {
        let source = ty("class A { string helper; }");
        let err = ensure_access_member(&source, "B", Some("helper"), AccessMemberKind::Field, false)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TARGET_CONFLICT);
    }

    #[test]
    fn constructor_initialization_replaces_inline_initializer() {
        let source = ty(indoc! {"
            class A
            {
                private readonly B _b = new B();
                public A()
                {
                    Init();
                }
                public A(int x) : this() { }
            }"});
        let access = AccessMember {
            name: "_b".into(),
            kind: AccessMemberKind::Field,
            created: false,
        };
        let updated =
            initialize_access_member(&source, &access, "B", &["Limit".into(), "this".into()], "    ")
                .unwrap();
        let text = updated.to_source();
        assert!(text.contains("private readonly B _b;"));
        assert!(text.contains("        Init();\n        _b = new B(Limit, this);\n    }"));
        assert!(text.contains("public A(int x) : this() { }"));
    }

    #[test]
    fn existing_assignment_is_replaced() {
        let source = ty("class A { B _b; A() { _b = new B(); } }");
        let access = AccessMember {
            name: "_b".into(),
            kind: AccessMemberKind::Field,
            created: false,
        };
        let updated = initialize_access_member(&source, &access, "B", &["this".into()], "  ").unwrap();
        assert!(updated.to_source().contains("A() { _b = new B(this); }"));
    }

    #[test]
    fn generates_constructor_when_missing() {
        let source = ty("class A { B _b; }");
        let access = AccessMember {
            name: "_b".into(),
            kind: AccessMemberKind::Field,
            created: true,
        };
        let updated = initialize_access_member(&source, &access, "B", &["this".into()], "    ").unwrap();
        assert_eq!(updated.constructors().count(), 1);
        assert!(updated.to_source().contains("_b = new B(this);"));
    }

    #[test]
    fn target_constructor_gains_fields_and_parameters() {
        let target = ty("class B { public B() { } }");
        let deps = vec![
            TargetDependency {
                field: "Limit".into(),
                type_text: "int".into(),
            },
            TargetDependency {
                field: "_a".into(),
                type_text: "A".into(),
            },
        ];
        let (updated, order) = inject_constructor_dependencies(&target, &deps, "    ").unwrap();
        assert_eq!(order, vec!["Limit".to_string(), "_a".to_string()]);
        let ctor = updated.constructors().next().unwrap();
        assert_eq!(ctor.params.names(), vec!["limit".to_string(), "a".to_string()]);
        let text = updated.to_source();
        assert!(text.contains("private int Limit;"));
        assert!(text.contains("this._a = a;"));

        // A second move reuses the injecting constructor.
        let (again, order) = inject_constructor_dependencies(&updated, &deps[..1], "    ").unwrap();
        assert_eq!(again.constructors().count(), 1);
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn unrelated_constructors_are_left_alone() {
        let target = ty("class B { public B(string name) { } }");
        let deps = vec![TargetDependency {
            field: "Limit".into(),
            type_text: "int".into(),
        }];
        let (updated, order) = inject_constructor_dependencies(&target, &deps, "    ").unwrap();
        assert_eq!(updated.constructors().count(), 2);
        assert_eq!(order, vec!["Limit".to_string()]);
    }
}
