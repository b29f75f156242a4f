//! Merging a moved method into its target compilation unit.

use crate::errors::{ErrorCode, RelocationError, Result};
use crate::syntax::modifiers::remove_modifier;
use crate::syntax::{
    parse_compilation_unit, parse_type, tokenize, CompilationUnit, Item, Member, MethodDecl,
    NamespaceDecl, TypeBody, TypeDecl, UsingDirective,
};
use im::Vector;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MergeStatus {
    Appended,
    /// The target type didn't exist and was created.
    Created,
    /// The target already declares a method with the same name and arity.
    NoOp { note: String },
}

/// A new `public class` with an empty body.
pub fn new_class(name: &str) -> Result<TypeDecl> {
    parse_type(&format!("public class {name}\n{{\n}}"))
        .map_err(|err| RelocationError::parse("<generated>", err))
}

/// An empty compilation unit for a new target file, with a namespace
/// declaration when `namespace` is known.
pub fn new_file_unit(namespace: Option<&str>, file_scoped: bool) -> Result<CompilationUnit> {
    let text = match namespace {
        Some(ns) if file_scoped => format!("namespace {ns};\n"),
        Some(ns) => format!("namespace {ns}\n{{\n}}\n"),
        None => String::new(),
    };
    parse_compilation_unit(&text).map_err(|err| RelocationError::parse("<generated>", err))
}

/// Adds `method` to `target_type` in `unit`.
///
/// `prepared` is the target declaration after constructor injection; when
/// present it replaces the declaration found in `unit`. A missing target is
/// created in the `namespace` declaration of `unit`, or at the top level.
pub fn merge_into(
    unit: &CompilationUnit,
    target_type: &str,
    prepared: Option<&TypeDecl>,
    method: &MethodDecl,
    namespace: Option<&str>,
) -> Result<(CompilationUnit, MergeStatus)> {
    match unit.find_type(target_type) {
        Some(original) => {
            let base = prepared.cloned().unwrap_or_else(|| original.clone());
            if !base.kind.accepts_methods() || matches!(base.body, TypeBody::Raw(_)) {
                return Err(RelocationError::precondition(
                    ErrorCode::TARGET_CONFLICT,
                    format!(
                        "'{target_type}' can't receive '{}': it is declared as {:?}",
                        method.name(),
                        base.kind
                    ),
                ));
            }

            let key = method.signature_key();
            if base.methods().any(|m| m.signature_key() == key) {
                let note = format!(
                    "'{target_type}' already declares '{}' with {} parameter(s); left unchanged",
                    key.0, key.1
                );
                debug!(target = target_type, method = %key.0, "No-op merge");
                let unit = replace(unit, &original, base)?;
                return Ok((unit, MergeStatus::NoOp { note }));
            }

            let updated = append_member(&base, Member::Method(method.clone()));
            Ok((replace(unit, &original, updated)?, MergeStatus::Appended))
        }
        None => {
            let mut method = method.clone();
            remove_modifier(&mut method.modifiers, "override", method.return_type.first_mut());
            let base = match prepared {
                Some(prepared) => prepared.clone(),
                None => new_class(target_type)?,
            };
            let created = append_member(&base, Member::Method(method));
            debug!(target = target_type, namespace = ?namespace, "Created target type");
            Ok((insert_type(unit, created, namespace), MergeStatus::Created))
        }
    }
}

fn replace(unit: &CompilationUnit, original: &TypeDecl, updated: TypeDecl) -> Result<CompilationUnit> {
    if original == &updated {
        return Ok(unit.clone());
    }
    unit.replace_type(original, updated).ok_or_else(|| {
        RelocationError::precondition(
            ErrorCode::TYPE_NOT_FOUND,
            format!("'{}' disappeared from its file while merging", original.name()),
        )
    })
}

fn append_member(ty: &TypeDecl, member: Member) -> TypeDecl {
    let mut members = ty.members();
    members.push_back(member);
    ty.with_members(members)
}

fn insert_type(unit: &CompilationUnit, ty: TypeDecl, namespace: Option<&str>) -> CompilationUnit {
    fn insert(items: &Vector<Item>, prefix: Option<&str>, target: &str, ty: &TypeDecl) -> Option<Vector<Item>> {
        for (index, item) in items.iter().enumerate() {
            if let Item::Namespace(ns) = item {
                let name = match prefix {
                    Some(outer) => format!("{outer}.{}", ns.name),
                    None => ns.name.clone(),
                };
                let updated = if name == target {
                    let mut inner = ns.items.clone();
                    inner.push_back(Item::Type(ty.clone()));
                    Some(inner)
                } else {
                    insert(&ns.items, Some(&name), target, ty)
                };
                if let Some(inner) = updated {
                    let ns = NamespaceDecl {
                        items: inner,
                        ..ns.clone()
                    };
                    return Some(items.update(index, Item::Namespace(ns)));
                }
            }
        }
        None
    }

    let items = namespace
        .and_then(|ns| insert(&unit.items, None, ns, &ty))
        .unwrap_or_else(|| {
            let mut items = unit.items.clone();
            items.push_back(Item::Type(ty));
            items
        });
    CompilationUnit {
        items,
        eof: unit.eof.clone(),
    }
}

/// Copies the source file's using directives that `target` lacks. Directives
/// naming either file's own namespace are skipped; the source namespace is
/// added when the two namespaces differ, so the receiver type resolves.
pub fn propagate_usings(
    source: &CompilationUnit,
    target: &CompilationUnit,
    source_namespace: Option<&str>,
    target_namespace: Option<&str>,
) -> Result<CompilationUnit> {
    let mut present: BTreeSet<String> = target.usings().iter().map(UsingDirective::target).collect();
    let mut updated = target.clone();
    for using in source.usings() {
        let name = using.target();
        let own = Some(name.as_str()) == source_namespace || Some(name.as_str()) == target_namespace;
        if own || present.contains(&name) {
            continue;
        }
        updated = add_using(&updated, &name)?;
        present.insert(name);
    }
    if let Some(ns) = source_namespace {
        if Some(ns) != target_namespace && !present.contains(ns) {
            updated = add_using(&updated, ns)?;
        }
    }
    Ok(updated)
}

/// Inserts `using name;` after the last top-level using directive.
pub fn add_using(unit: &CompilationUnit, name: &str) -> Result<CompilationUnit> {
    let (tokens, _) = tokenize(&format!("using {name};"))
        .map_err(|err| RelocationError::parse("<generated>", err.into()))?;
    let mut using = UsingDirective { tokens };
    let mut items = unit.items.clone();

    let last_using = items
        .iter()
        .enumerate()
        .filter(|(_, item)| matches!(item, Item::Using(_)))
        .map(|(i, _)| i)
        .last();
    match last_using {
        Some(index) => {
            if let Some(first) = using.tokens.first_mut() {
                first.leading = "\n".to_string();
            }
            items.insert(index + 1, Item::Using(using));
        }
        None => {
            let mut first_item = items.pop_front();
            if let (Some(item), Some(first)) = (first_item.as_mut(), using.tokens.first_mut()) {
                if let Some(next) = item.first_token_mut() {
                    first.leading = std::mem::replace(&mut next.leading, "\n\n".to_string());
                }
            }
            if let Some(item) = first_item {
                items.push_front(item);
            }
            items.push_front(Item::Using(using));
        }
    }
    debug!(using = name, "Added using directive");
    Ok(CompilationUnit {
        items,
        eof: unit.eof.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_member;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn method(source: &str) -> MethodDecl {
        match parse_member(source, "A").unwrap() {
            Member::Method(m) => m,
            other => panic!("expected a method, got {other:?}"),
        }
    }

    #[test]
    fn appends_to_existing_target() {
        let unit = parse_compilation_unit("class B { void F() { } }").unwrap();
        let (merged, status) =
            merge_into(&unit, "B", None, &method(" internal static int Add(int val, int x) => x + val;"), None)
                .unwrap();
        assert_eq!(status, MergeStatus::Appended);
        assert_eq!(merged.find_type("B").unwrap().methods().count(), 2);
    }

    #[test]
    fn same_name_and_arity_is_a_no_op() {
        let unit = parse_compilation_unit("class B { int Add(int a, int b) { return 0; } }").unwrap();
        let (merged, status) =
            merge_into(&unit, "B", None, &method("int Add(int val, int x) => x + val;"), None).unwrap();
        assert!(matches!(status, MergeStatus::NoOp { ref note } if note.contains("Add")));
        assert_eq!(merged, unit);
    }

    #[test]
    fn creates_missing_target_in_namespace_without_override() {
        let unit = parse_compilation_unit(indoc! {"
            namespace Shop.Billing
            {
                class A { }
            }
        "})
        .unwrap();
        let (merged, status) = merge_into(
            &unit,
            "B",
            None,
            &method("public override int Foo(A @this) { return 1; }"),
            Some("Shop.Billing"),
        )
        .unwrap();
        assert_eq!(status, MergeStatus::Created);
        assert_eq!(merged.namespace_of("B").as_deref(), Some("Shop.Billing"));
        let created = merged.find_type("B").unwrap();
        assert!(!created.methods().next().unwrap().has_modifier("override"));
        assert!(created.to_source().starts_with("public class B"));
    }

    #[test]
    fn enums_cannot_receive_methods() {
        let unit = parse_compilation_unit("enum B { One, Two }").unwrap();
        let err = merge_into(&unit, "B", None, &method("void F() { }"), None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TARGET_CONFLICT);
    }

    #[test]
    fn usings_are_propagated_once() {
        let source = parse_compilation_unit(indoc! {"
            using System;
            using System.Linq;
            using Shop.Core;

            namespace Shop.Core
            {
                class A { }
            }
        "})
        .unwrap();
        let target = parse_compilation_unit("using System;\n\nnamespace Shop.Billing\n{\n}\n").unwrap();
        let merged = propagate_usings(&source, &target, Some("Shop.Core"), Some("Shop.Billing")).unwrap();
        let names: Vec<String> = merged.usings().iter().map(UsingDirective::target).collect();
        assert_eq!(names, vec!["System", "System.Linq", "Shop.Core"]);
        assert!(merged.to_source().starts_with("using System;\nusing System.Linq;\nusing Shop.Core;\n\nnamespace"));
    }

    #[test]
    fn first_using_goes_above_existing_items() {
        let unit = parse_compilation_unit("class B { }\n").unwrap();
        let updated = add_using(&unit, "Shop.Core").unwrap();
        assert_eq!(updated.to_source(), "using Shop.Core;\n\nclass B { }\n");
    }

    #[test]
    fn new_files_follow_namespace_style() {
        let block = new_file_unit(Some("Shop"), false).unwrap();
        assert!(!block.first_namespace().unwrap().is_file_scoped());
        let scoped = new_file_unit(Some("Shop"), true).unwrap();
        assert!(scoped.first_namespace().unwrap().is_file_scoped());
        assert!(new_file_unit(None, false).unwrap().items.is_empty());
    }
}
