//! Parameter list and signature edits.

use super::InjectedParameter;
use crate::syntax::{MethodDecl, Param, Token};
use std::collections::BTreeSet;

pub fn receiver_param(type_name: &str, name: &str) -> Param {
    Param::new(type_name, name)
}

pub fn injected_param(injected: &InjectedParameter) -> Param {
    let mut param = Param::new(&injected.type_text, &injected.parameter);
    if injected.by_ref {
        param.prefix = vec![Token::ident("ref")];
        if let Some(first) = param.ty.first_mut() {
            first.leading = " ".to_string();
        }
    }
    param
}

/// Where injected parameters go: after the receiver parameter or after the
/// `this` parameter of an extension method.
pub fn injection_position(method: &MethodDecl, receiver_added: bool) -> usize {
    let extension = method
        .params
        .params
        .first()
        .is_some_and(|p| p.has_modifier("this"));
    usize::from(receiver_added || extension)
}

/// Qualifies references to `nested` types in the return type, parameter
/// types and constraints. Returns the names that were qualified.
pub fn qualify_nested_types(
    method: &mut MethodDecl,
    nested: &BTreeSet<String>,
    qualifier: &str,
) -> BTreeSet<String> {
    let type_params: BTreeSet<String> = method.type_param_names().into_iter().collect();
    let mut qualified = BTreeSet::new();
    let mut qualify = |tokens: &mut [Token]| {
        for i in 0..tokens.len() {
            let name = tokens[i].ident_name().to_string();
            let after_dot = i > 0 && (tokens[i - 1].is(".") || tokens[i - 1].is("::"));
            if tokens[i].is_ident()
                && !after_dot
                && nested.contains(&name)
                && !type_params.contains(&name)
            {
                tokens[i].text = format!("{qualifier}.{}", tokens[i].text);
                qualified.insert(name);
            }
        }
    };
    qualify(&mut method.return_type);
    for param in method.params.params.iter_mut() {
        qualify(&mut param.ty);
        qualify(&mut param.default);
    }
    qualify(&mut method.constraints);
    qualified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{parse_member, Member};

    fn method(source: &str) -> MethodDecl {
        match parse_member(source, "A").unwrap() {
            Member::Method(m) => m,
            other => panic!("expected a method, got {other:?}"),
        }
    }

    #[test]
    fn qualifies_nested_types_in_signature() {
        let mut m = method("Node Find<T>(List<Node> nodes, Other.Node other) where T : Node { return null; }");
        let nested: BTreeSet<String> = ["Node".to_string()].into();
        let qualified = qualify_nested_types(&mut m, &nested, "Tree");
        assert_eq!(qualified.len(), 1);
        assert_eq!(
            m.to_source(),
            "Tree.Node Find<T>(List<Tree.Node> nodes, Other.Node other) where T : Tree.Node { return null; }"
        );
    }

    #[test]
    fn ref_parameters_render_with_spacing() {
        let param = injected_param(&InjectedParameter {
            member: "_count".into(),
            parameter: "count".into(),
            type_text: "int".into(),
            by_ref: true,
        });
        let mut m = method("void Bump(int step) { }");
        let position = injection_position(&m, false);
        m.params.insert(position, param);
        assert_eq!(m.to_source(), "void Bump(ref int count, int step) { }");
    }

    #[test]
    fn extension_this_stays_first() {
        let m = method("static int Twice(this int x) => x * 2;");
        assert_eq!(injection_position(&m, false), 1);
    }
}
