//! What a method body needs from the type it is declared in.

use super::catalog::MemberCatalog;
use crate::syntax::{scan, MethodDecl, OccurrenceKind};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MethodProfile {
    pub is_static: bool,
    pub uses_instance_members: bool,
    pub calls_other_methods: bool,
    pub is_recursive: bool,
    pub uses_receiver_directly: bool,
    pub calls_base_implementation: bool,
    /// Private instance fields in order of first use.
    pub used_private_fields: Vec<String>,
    /// Private fields assigned, incremented or passed by `ref`/`out`.
    pub written_private_fields: BTreeSet<String>,
    pub used_static_members: BTreeSet<String>,
    pub used_nested_types: BTreeSet<String>,
}

impl MethodProfile {
    /// Whether the moved method needs the source instance. Over-approximates
    /// for bodies whose only instance use is injectable state.
    pub fn needs_receiver(&self) -> bool {
        !self.is_static
            && (self.uses_receiver_directly
                || self.uses_instance_members
                || self.calls_other_methods
                || self.is_recursive
                || self.calls_base_implementation)
    }

    fn use_private_field(&mut self, name: &str, written: bool) {
        if !self.used_private_fields.iter().any(|f| f == name) {
            self.used_private_fields.push(name.to_string());
        }
        if written {
            self.written_private_fields.insert(name.to_string());
        }
    }
}

/// Names that hide members of the declaring type throughout `method`.
/// Locals hide them only where they are in scope; see
/// [`Occurrence::local`](crate::syntax::Occurrence).
pub fn shadowing_names(method: &MethodDecl) -> BTreeSet<String> {
    let mut names: BTreeSet<String> = method.params.names().into_iter().collect();
    names.extend(method.type_param_names());
    names
}

pub fn profile(method: &MethodDecl, catalog: &MemberCatalog) -> MethodProfile {
    let body = scan(method.body.code());
    let shadowed = shadowing_names(method);
    let own_name = method.name();
    let mut result = MethodProfile {
        is_static: method.is_static(),
        ..MethodProfile::default()
    };

    for occurrence in &body.occurrences {
        let name = occurrence.name.as_str();
        match occurrence.kind {
            OccurrenceKind::Receiver => result.uses_receiver_directly = true,
            OccurrenceKind::ThisMember => {
                if occurrence.invoked && name == own_name {
                    result.is_recursive = true;
                } else if occurrence.invoked && catalog.method_names.contains(name) {
                    result.calls_other_methods = true;
                } else {
                    result.uses_instance_members = true;
                }
                if catalog.is_private_field(name) {
                    result.use_private_field(name, occurrence.written);
                }
            }
            OccurrenceKind::BaseMember => {
                if occurrence.invoked && name == own_name {
                    result.calls_base_implementation = true;
                } else {
                    result.uses_instance_members = true;
                }
            }
            OccurrenceKind::SimpleName if !occurrence.local && !shadowed.contains(name) => {
                if catalog.is_instance_member(name) && !result.is_static {
                    if catalog.is_private_field(name) {
                        result.uses_instance_members = true;
                        result.use_private_field(name, occurrence.written);
                    } else if occurrence.invoked && name == own_name {
                        result.is_recursive = true;
                    } else if occurrence.invoked && catalog.method_names.contains(name) {
                        result.calls_other_methods = true;
                    } else {
                        result.uses_instance_members = true;
                    }
                } else if catalog.is_static_member(name) {
                    result.used_static_members.insert(name.to_string());
                } else if catalog.nested_type_names.contains(name) {
                    result.used_nested_types.insert(name.to_string());
                }
            }
            _ => {}
        }
    }

    debug!(
        method = own_name,
        needs_receiver = result.needs_receiver(),
        private_fields = ?result.used_private_fields,
        "Profiled method"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relocation::catalog::build_catalog;
    use crate::syntax::{parse_compilation_unit, Member};
    use crate::workspace::UnitIndex;
    use indoc::indoc;

    fn profile_of(source: &str, method: &str) -> MethodProfile {
        let unit = parse_compilation_unit(source).unwrap();
        let ty = unit.find_type("A").unwrap();
        let catalog = build_catalog(&ty, &UnitIndex::new([&unit]));
        let decl = ty
            .members()
            .into_iter()
            .find_map(|m| match m {
                Member::Method(m) if m.name() == method => Some(m),
                _ => None,
            })
            .unwrap();
        profile(&decl, &catalog)
    }

    const SOURCE: &str = indoc! {"
        class A
        {
            int total;
            int count;
            public int Limit { get; set; }
            static int Scale = 2;
            class Node {}

            int Add(int val) { total += val; return total; }
            int Pure(int x) { return x * Scale; }
            int Shadowed(int total) { var count = total; return count; }
            int Scoped(int[] xs) { var n = xs.Count(count => count > 0); if (n > 0) { int total = n; return total; } return total; }
            int Self() { return Describe(this); }
            int Fact(int n) { return n <= 1 ? 1 : n * Fact(n - 1); }
            int Sibling() { return Pure(Limit); }
            Node Make() { return new Node(); }
            static int Twice(int x) { return x * 2; }
        }
    "};

    #[test]
    fn private_fields_are_recorded_in_order_with_writes() {
        let profile = profile_of(SOURCE, "Add");
        assert_eq!(profile.used_private_fields, vec!["total"]);
        assert!(profile.written_private_fields.contains("total"));
        assert!(profile.needs_receiver());
    }

    #[test]
    fn static_only_bodies_need_no_receiver() {
        let profile = profile_of(SOURCE, "Pure");
        assert!(!profile.needs_receiver());
        assert!(profile.used_static_members.contains("Scale"));
    }

    #[test]
    fn parameters_and_locals_shadow_members() {
        let profile = profile_of(SOURCE, "Shadowed");
        assert!(profile.used_private_fields.is_empty());
        assert!(!profile.needs_receiver());
    }

    #[test]
    fn names_outside_a_local_scope_still_reach_fields() {
        let profile = profile_of(SOURCE, "Scoped");
        assert_eq!(profile.used_private_fields, vec!["total"]);
        assert!(profile.needs_receiver());
    }

    #[test]
    fn receiver_recursion_and_sibling_calls() {
        assert!(profile_of(SOURCE, "Self").uses_receiver_directly);
        assert!(profile_of(SOURCE, "Fact").is_recursive);
        let sibling = profile_of(SOURCE, "Sibling");
        assert!(sibling.calls_other_methods);
        assert!(sibling.uses_instance_members);
        assert!(profile_of(SOURCE, "Make").used_nested_types.contains("Node"));
    }

    #[test]
    fn static_methods_never_need_a_receiver() {
        let profile = profile_of(SOURCE, "Twice");
        assert!(profile.is_static);
        assert!(!profile.needs_receiver());
    }

    #[test]
    fn base_call_to_own_name() {
        let profile = profile_of(
            "class A : B { public override int Foo() { return base.Foo() + 1; } } class B { public virtual int Foo() => 1; }",
            "Foo",
        );
        assert!(profile.calls_base_implementation);
        assert!(profile.needs_receiver());
    }
}
