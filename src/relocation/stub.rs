//! Delegating members left behind in the source type.

use super::transform::Transformed;
use crate::errors::{RelocationError, Result};
use crate::syntax::format::line_indent;
use crate::syntax::modifiers::{promote_to_internal, remove_modifier};
use crate::syntax::{tokenize, Member, MethodBody, MethodDecl, Token};

/// Prefix of the wrapper that gives a moved method access to the base
/// implementation it overrides.
pub const BASE_WRAPPER_PREFIX: &str = "Base";

/// Builds the stub that replaces `original` in the source type. `access` is
/// the expression the stub calls through: the target type name for static
/// moves, the access member otherwise.
pub fn make_stub(
    original: &MethodDecl,
    access: &str,
    transformed: &Transformed,
    indent_unit: &str,
) -> Result<MethodDecl> {
    let call = delegating_call(original, access, transformed);
    let call = if original.is_async() {
        format!("await {call}")
    } else {
        call
    };

    let mut stub = original.clone();
    stub.body = match &original.body {
        MethodBody::Arrow { arrow, semi, .. } => MethodBody::Arrow {
            arrow: arrow.clone(),
            expr: generated_tokens(&format!(" {call}"))?,
            semi: semi.clone(),
        },
        MethodBody::Block(block) => {
            let member_leading = Member::Method(original.clone()).leading_trivia();
            let outer = line_indent(&member_leading).unwrap_or_default();
            let statement = if original.returns_void() {
                format!("{call};")
            } else {
                format!("return {call};")
            };
            let single_line = block.iter().skip(1).all(|t| !t.leading.contains('\n'));
            let text = if single_line {
                format!("{{ {statement} }}")
            } else {
                format!("{{\n{outer}{indent_unit}{statement}\n{outer}}}")
            };
            let mut tokens = generated_tokens(&text)?;
            if let (Some(first), Some(open)) = (tokens.first_mut(), block.first()) {
                first.leading = open.leading.clone();
            }
            MethodBody::Block(tokens)
        }
        MethodBody::Semicolon(_) => original.body.clone(),
    };
    Ok(stub)
}

/// `access.Name<T>(receiver, injected..., args...)` in the parameter order
/// of the moved method.
fn delegating_call(original: &MethodDecl, access: &str, transformed: &Transformed) -> String {
    let param_names = original.params.names();
    let mut args: Vec<String> = original
        .params
        .params
        .iter()
        .map(|p| match p.passing_modifier() {
            Some(modifier) => format!("{modifier} {}", p.name()),
            None => p.name().to_string(),
        })
        .collect();

    let extension = original
        .params
        .params
        .first()
        .is_some_and(|p| p.has_modifier("this"));
    let position = usize::from(extension).min(args.len());
    for (offset, injected) in transformed.injected.iter().enumerate() {
        let member = if param_names.iter().any(|n| *n == injected.member) {
            format!("this.{}", injected.member)
        } else {
            injected.member.clone()
        };
        let arg = if injected.by_ref {
            format!("ref {member}")
        } else {
            member
        };
        args.insert(position + offset, arg);
    }
    if transformed.needs_receiver_parameter {
        args.insert(0, "this".to_string());
    }

    let type_args = original.type_param_names();
    let type_args = if type_args.is_empty() {
        String::new()
    } else {
        format!("<{}>", type_args.join(", "))
    };
    format!("{access}.{}{type_args}({})", original.name(), args.join(", "))
}

/// Builds `Base<Name>`: a non-virtual member that calls the base
/// implementation `original` overrides. The result has no leading trivia so
/// formatting places it.
pub fn make_base_wrapper(original: &MethodDecl, indent_unit: &str) -> Result<MethodDecl> {
    let mut wrapper = original.clone();
    wrapper.attributes.clear();
    for keyword in ["override", "virtual", "sealed", "abstract", "new", "async"] {
        remove_modifier(&mut wrapper.modifiers, keyword, wrapper.return_type.first_mut());
    }
    promote_to_internal(&mut wrapper.modifiers, wrapper.return_type.first_mut(), false);
    wrapper.name = Token::new(
        original.name.kind,
        format!("{BASE_WRAPPER_PREFIX}{}", original.name()),
    )
    .with_leading(original.name.leading.clone());

    let args: Vec<String> = original
        .params
        .params
        .iter()
        .map(|p| match p.passing_modifier() {
            Some(modifier) => format!("{modifier} {}", p.name()),
            None => p.name().to_string(),
        })
        .collect();
    let call = format!("base.{}({})", original.name(), args.join(", "));
    let statement = if original.return_type_text() == "void" {
        format!("{call};")
    } else {
        format!("return {call};")
    };
    let mut body = generated_tokens(&format!("{{\n{indent_unit}{statement}\n}}"))?;
    if let Some(open) = body.first_mut() {
        open.leading = " ".to_string();
    }
    wrapper.body = MethodBody::Block(body);

    if let Some(first) = wrapper.modifiers.first_mut().or(wrapper.return_type.first_mut()) {
        first.leading.clear();
    }
    Ok(wrapper)
}

fn generated_tokens(text: &str) -> Result<Vec<Token>> {
    tokenize(text)
        .map(|(tokens, _)| tokens)
        .map_err(|err| RelocationError::parse("<generated>", err.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relocation::transform::InjectedParameter;
    use crate::syntax::parse_member;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn method(source: &str) -> MethodDecl {
        match parse_member(source, "A").unwrap() {
            Member::Method(m) => m,
            other => panic!("expected a method, got {other:?}"),
        }
    }

    fn transformed(method: MethodDecl, receiver: bool, injected: Vec<InjectedParameter>) -> Transformed {
        Transformed {
            method,
            needs_receiver_parameter: receiver,
            made_static: !receiver,
            calls_base_implementation: false,
            injected,
            target_dependencies: Vec::new(),
            receiver_field: None,
            exposed_members: BTreeSet::new(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn block_stub_delegates_with_injected_state() {
        let original = method("\n    public int Add(int x)\n    {\n        return x + Val;\n    }");
        let moved = transformed(
            original.clone(),
            false,
            vec![InjectedParameter {
                member: "Val".into(),
                parameter: "val".into(),
                type_text: "int".into(),
                by_ref: false,
            }],
        );
        let stub = make_stub(&original, "B", &moved, "    ").unwrap();
        assert_eq!(
            stub.to_source(),
            "\n    public int Add(int x)\n    {\n        return B.Add(Val, x);\n    }"
        );
    }

    #[test]
    fn one_line_bodies_stay_on_one_line() {
        let original = method("\n    public int Add(int x) { return x + Val; }");
        let moved = transformed(original.clone(), true, Vec::new());
        let stub = make_stub(&original, "_b", &moved, "    ").unwrap();
        assert_eq!(
            stub.to_source(),
            "\n    public int Add(int x) { return _b.Add(this, x); }"
        );
    }

    #[test]
    fn receiver_and_ref_arguments() {
        let original = method("void Bump(ref int step, out int total) { total = step; }");
        let moved = transformed(
            original.clone(),
            true,
            vec![InjectedParameter {
                member: "step".into(),
                parameter: "step2".into(),
                type_text: "int".into(),
                by_ref: true,
            }],
        );
        let stub = make_stub(&original, "_b", &moved, "  ").unwrap();
        assert!(stub
            .to_source()
            .contains("_b.Bump(this, ref this.step, ref step, out total);"));
    }

    #[test]
    fn async_arrow_stub_awaits() {
        let original = method("async Task<int> LoadAsync<T>(T key) => await Fetch(key);");
        let moved = transformed(original.clone(), true, Vec::new());
        let stub = make_stub(&original, "_store", &moved, "    ").unwrap();
        assert_eq!(
            stub.to_source(),
            "async Task<int> LoadAsync<T>(T key) => await _store.LoadAsync<T>(this, key);"
        );
    }

    #[test]
    fn base_wrapper_calls_the_overridden_member() {
        let original = method("[Obsolete] public override int Foo(int x) { return base.Foo(x) + 1; }");
        let wrapper = make_base_wrapper(&original, "    ").unwrap();
        assert_eq!(
            wrapper.to_source(),
            "public int BaseFoo(int x) {\n    return base.Foo(x);\n}"
        );
    }
}
