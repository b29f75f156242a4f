//! Member catalog of a type and its bases.

use crate::syntax::{Member, TypeDecl, TypeKind, Visibility};
use crate::workspace::TypeIndex;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use tracing::{debug, debug_span};

/// Names a method body can reach without qualification, grouped by how a
/// moved copy of the body has to reach them instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberCatalog {
    pub type_name: String,
    /// Instance fields, properties, events and methods, own and inherited.
    pub instance_members: BTreeSet<String>,
    pub method_names: BTreeSet<String>,
    /// Static fields, static properties and constants.
    pub static_field_names: BTreeSet<String>,
    pub static_method_names: BTreeSet<String>,
    pub nested_type_names: BTreeSet<String>,
    /// Private instance fields of the declaring type, with their type text.
    pub private_field_types: BTreeMap<String, String>,
    /// Type text of every field and property. Own members win over inherited
    /// ones.
    pub member_types: BTreeMap<String, String>,
    pub property_names: BTreeSet<String>,
    /// Accessibility of members declared directly in the type.
    pub declared_visibility: BTreeMap<String, Visibility>,
    /// Accessibility of non-private members inherited from bases.
    pub inherited_visibility: BTreeMap<String, Visibility>,
    /// Types whose members were collected, in traversal order.
    pub visited_types: Vec<String>,
}

impl MemberCatalog {
    pub fn is_instance_member(&self, name: &str) -> bool {
        self.instance_members.contains(name)
    }

    pub fn is_static_member(&self, name: &str) -> bool {
        self.static_field_names.contains(name) || self.static_method_names.contains(name)
    }

    pub fn is_private_field(&self, name: &str) -> bool {
        self.private_field_types.contains_key(name)
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.declared_visibility.contains_key(name)
    }

    pub fn is_state(&self, name: &str) -> bool {
        self.member_types.contains_key(name)
    }

    /// Accessibility of a declared or inherited member.
    pub fn visibility_of(&self, name: &str) -> Option<Visibility> {
        self.declared_visibility
            .get(name)
            .or_else(|| self.inherited_visibility.get(name))
            .copied()
    }
}

/// Collects the members of `ty`, its other partial declarations and,
/// breadth first, its bases and interfaces. Bases missing from the index end
/// that branch of the traversal.
pub fn build_catalog(ty: &TypeDecl, index: &dyn TypeIndex) -> MemberCatalog {
    let _span = debug_span!("build_catalog", type_name = ty.name()).entered();
    let mut catalog = MemberCatalog {
        type_name: ty.name().to_string(),
        ..MemberCatalog::default()
    };

    let mut parts = vec![ty.clone()];
    parts.extend(index.find_types(ty.name()).into_iter().filter(|other| other != ty));

    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(ty.name().to_string());
    catalog.visited_types.push(ty.name().to_string());

    let mut queue: VecDeque<TypeDecl> = VecDeque::new();
    for part in &parts {
        collect_members(&mut catalog, part, true);
        queue.extend(index.base_types(part));
    }

    while let Some(base) = queue.pop_front() {
        if !visited.insert(base.name().to_string()) {
            continue;
        }
        catalog.visited_types.push(base.name().to_string());
        collect_members(&mut catalog, &base, false);
        queue.extend(index.base_types(&base));
    }

    debug!(
        visited = ?catalog.visited_types,
        instance = catalog.instance_members.len(),
        private_fields = catalog.private_field_types.len(),
        "Catalog built"
    );
    catalog
}

fn collect_members(catalog: &mut MemberCatalog, ty: &TypeDecl, own: bool) {
    for member in ty.members() {
        let visibility = match member.visibility() {
            Visibility::Implicit if ty.kind == TypeKind::Interface => Visibility::Public,
            other => other,
        };
        if !own && visibility.is_private() {
            continue;
        }
        let is_static = member.is_static();
        for name in member.declared_names() {
            if own {
                catalog.declared_visibility.entry(name.clone()).or_insert(visibility);
            } else if !catalog.declared_visibility.contains_key(&name) {
                catalog.inherited_visibility.entry(name.clone()).or_insert(visibility);
            }
            match &member {
                Member::Method(_) => {
                    catalog.method_names.insert(name.clone());
                    if is_static {
                        catalog.static_method_names.insert(name);
                    } else {
                        catalog.instance_members.insert(name);
                    }
                }
                Member::Field(field) => {
                    catalog.member_types.entry(name.clone()).or_insert_with(|| field.type_text());
                    if is_static {
                        catalog.static_field_names.insert(name);
                    } else {
                        if own && visibility.is_private() {
                            catalog.private_field_types.insert(name.clone(), field.type_text());
                        }
                        catalog.instance_members.insert(name);
                    }
                }
                Member::Property(property) => {
                    catalog
                        .member_types
                        .entry(name.clone())
                        .or_insert_with(|| property.type_text());
                    catalog.property_names.insert(name.clone());
                    if is_static {
                        catalog.static_field_names.insert(name);
                    } else {
                        catalog.instance_members.insert(name);
                    }
                }
                Member::Type(_) | Member::Delegate(_) => {
                    catalog.nested_type_names.insert(name);
                }
                Member::Constructor(_) | Member::Other(_) => {}
            }
        }
    }
}
