//! Type lookup across compilation units.

use crate::syntax::{CompilationUnit, TypeDecl};

/// Finds type declarations by simple name. Type identity is name based:
/// every declaration with a matching name is returned, which covers the
/// parts of a partial type.
pub trait TypeIndex {
    fn find_types(&self, name: &str) -> Vec<TypeDecl>;

    /// Declarations of the direct bases and interfaces of `ty`.
    fn base_types(&self, ty: &TypeDecl) -> Vec<TypeDecl> {
        ty.base_names()
            .iter()
            .flat_map(|name| self.find_types(name))
            .collect()
    }
}

/// Index over a fixed set of parsed units.
#[derive(Debug, Clone, Default)]
pub struct UnitIndex<'a> {
    units: Vec<&'a CompilationUnit>,
}

impl<'a> UnitIndex<'a> {
    pub fn new(units: impl IntoIterator<Item = &'a CompilationUnit>) -> Self {
        Self {
            units: units.into_iter().collect(),
        }
    }
}

impl TypeIndex for UnitIndex<'_> {
    fn find_types(&self, name: &str) -> Vec<TypeDecl> {
        self.units
            .iter()
            .flat_map(|unit| unit.types())
            .map(|(_, ty)| ty)
            .filter(|ty| ty.name() == name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_compilation_unit;

    #[test]
    fn finds_partial_declarations_across_units() {
        let a = parse_compilation_unit("partial class A : Base { void F() {} }").unwrap();
        let b = parse_compilation_unit("partial class A { int x; } class Base {}").unwrap();
        let index = UnitIndex::new([&a, &b]);

        assert_eq!(index.find_types("A").len(), 2);
        let source = a.find_type("A").unwrap();
        let bases = index.base_types(&source);
        assert_eq!(bases.len(), 1);
        assert_eq!(bases[0].name(), "Base");
        assert!(index.find_types("Missing").is_empty());
    }
}
