//! Call resolution between the methods of a batch.

use super::catalog::build_catalog;
use super::profile::shadowing_names;
use crate::syntax::{scan, MethodDecl, OccurrenceKind, Token};
use crate::workspace::TypeIndex;
use std::collections::BTreeMap;

/// A method named in a batch, with the type it is declared in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub type_name: String,
    pub method: MethodDecl,
}

impl BatchEntry {
    pub fn new(type_name: impl Into<String>, method: MethodDecl) -> Self {
        Self {
            type_name: type_name.into(),
            method,
        }
    }

    pub fn name(&self) -> &str {
        self.method.name()
    }
}

/// Finds which batch entries a method calls.
pub trait CallResolver {
    /// Indices into `batch` of the methods `caller` invokes.
    fn callees(&self, caller: &BatchEntry, batch: &[BatchEntry]) -> Vec<usize>;
}

/// Syntactic matching on method names. Used when no program is loaded.
///
/// Unqualified and `this.` calls match entries of the caller's own type;
/// `Type.Name(...)` matches entries of `Type`; calls on any other receiver
/// match every entry with that name.
#[derive(Debug, Default, Clone, Copy)]
pub struct NameResolver;

impl CallResolver for NameResolver {
    fn callees(&self, caller: &BatchEntry, batch: &[BatchEntry]) -> Vec<usize> {
        let code = caller.method.body.code();
        let body = scan(code);
        let shadowed = shadowing_names(&caller.method);
        let mut out = Vec::new();
        for occurrence in body.occurrences.iter().filter(|o| o.invoked) {
            let matches = |entry: &BatchEntry| entry.name() == occurrence.name;
            match occurrence.kind {
                OccurrenceKind::SimpleName
                    if !occurrence.local && !shadowed.contains(&occurrence.name) =>
                {
                    push_matching(&mut out, batch, |e| {
                        matches(e) && e.type_name == caller.type_name
                    });
                }
                OccurrenceKind::ThisMember => push_matching(&mut out, batch, |e| {
                    matches(e) && e.type_name == caller.type_name
                }),
                OccurrenceKind::MemberAccess => match qualifier(code, occurrence.index) {
                    Some(q) if batch.iter().any(|e| e.type_name == q) => {
                        push_matching(&mut out, batch, |e| matches(e) && e.type_name == q)
                    }
                    _ => push_matching(&mut out, batch, matches),
                },
                _ => {}
            }
        }
        out
    }
}

/// Resolves through declarations: unqualified calls against the caller's
/// catalog, `Type.Name(...)` against type names, and `member.Name(...)`
/// against the declared type of the member or parameter. Calls on receivers
/// whose type is unknown resolve to nothing.
pub struct WorkspaceResolver<'a> {
    index: &'a dyn TypeIndex,
}

impl<'a> WorkspaceResolver<'a> {
    pub fn new(index: &'a dyn TypeIndex) -> Self {
        Self { index }
    }
}

impl CallResolver for WorkspaceResolver<'_> {
    fn callees(&self, caller: &BatchEntry, batch: &[BatchEntry]) -> Vec<usize> {
        let Some(declaring) = self.index.find_types(&caller.type_name).into_iter().next() else {
            return NameResolver.callees(caller, batch);
        };
        let catalog = build_catalog(&declaring, self.index);
        let code = caller.method.body.code();
        let body = scan(code);
        let shadowed = shadowing_names(&caller.method);

        let mut receiver_types: BTreeMap<String, String> = catalog.member_types.clone();
        for param in &caller.method.params.params {
            receiver_types.insert(param.name().to_string(), param.type_text());
        }

        let mut out = Vec::new();
        for occurrence in body.occurrences.iter().filter(|o| o.invoked) {
            let name = occurrence.name.as_str();
            let callee_type = match occurrence.kind {
                OccurrenceKind::SimpleName if !occurrence.local && !shadowed.contains(name) => {
                    catalog.method_names.contains(name).then(|| caller.type_name.clone())
                }
                OccurrenceKind::ThisMember => Some(caller.type_name.clone()),
                OccurrenceKind::MemberAccess => qualifier(code, occurrence.index).and_then(|q| {
                    if body.is_local_at(&q, occurrence.index - 2) {
                        None
                    } else if let Some(ty) = receiver_types.get(&q) {
                        Some(simple_type_name(ty))
                    } else {
                        Some(q)
                    }
                }),
                _ => None,
            };
            if let Some(callee_type) = callee_type {
                push_matching(&mut out, batch, |e| e.name() == name && e.type_name == callee_type);
            }
        }
        out
    }
}

fn push_matching(out: &mut Vec<usize>, batch: &[BatchEntry], predicate: impl Fn(&BatchEntry) -> bool) {
    for (i, entry) in batch.iter().enumerate() {
        if predicate(entry) && !out.contains(&i) {
            out.push(i);
        }
    }
}

/// The identifier right before the member operator preceding `index`, as in
/// `Type.Name` or `field.Name`.
fn qualifier(tokens: &[Token], index: usize) -> Option<String> {
    let before = tokens.get(index.checked_sub(2)?)?;
    before.is_ident().then(|| before.ident_name().to_string())
}

/// `Billing.Ledger<int>?` → `Ledger`.
pub(crate) fn simple_type_name(type_text: &str) -> String {
    let head = type_text
        .split(['<', '?', '['])
        .next()
        .unwrap_or(type_text)
        .trim();
    head.rsplit('.').next().unwrap_or(head).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_compilation_unit;
    use crate::workspace::UnitIndex;
    use indoc::indoc;

    const SOURCE: &str = indoc! {"
        class A
        {
            private readonly Ledger _ledger;
            int One() { return Two() + this.Three(); }
            int Two() { return _ledger.Post(); }
            int Three() { var list = new List(); return list.Post(); }
        }
        class Ledger
        {
            public int Post() { return 1; }
        }
    "};

    fn batch(unit: &crate::syntax::CompilationUnit) -> Vec<BatchEntry> {
        let a = unit.find_type("A").unwrap();
        let ledger = unit.find_type("Ledger").unwrap();
        let mut out: Vec<BatchEntry> = a.methods().map(|m| BatchEntry::new("A", m)).collect();
        out.extend(ledger.methods().map(|m| BatchEntry::new("Ledger", m)));
        out
    }

    #[test]
    fn name_resolution_over_approximates() {
        let unit = parse_compilation_unit(SOURCE).unwrap();
        let batch = batch(&unit);
        assert_eq!(NameResolver.callees(&batch[0], &batch), vec![1, 2]);
        assert_eq!(NameResolver.callees(&batch[1], &batch), vec![3]);
        assert_eq!(NameResolver.callees(&batch[2], &batch), vec![3]);
    }

    #[test]
    fn workspace_resolution_uses_member_types() {
        let unit = parse_compilation_unit(SOURCE).unwrap();
        let index = UnitIndex::new([&unit]);
        let resolver = WorkspaceResolver::new(&index);
        let batch = batch(&unit);
        assert_eq!(resolver.callees(&batch[0], &batch), vec![1, 2]);
        assert_eq!(resolver.callees(&batch[1], &batch), vec![3]);
        assert!(resolver.callees(&batch[2], &batch).is_empty());
    }

    #[test]
    fn strips_namespaces_and_type_arguments() {
        assert_eq!(simple_type_name("Billing.Ledger<int>?"), "Ledger");
        assert_eq!(simple_type_name("Ledger"), "Ledger");
    }
}
