//! One method move, computed entirely in memory.

use super::access::{
    accepts_default_construction, constructor_fields, ensure_access_member,
    initialize_access_member, inject_constructor_dependencies,
};
use super::catalog::build_catalog;
use super::merge::new_class;
use super::outcome::MoveOutcome;
use super::profile::profile;
use super::request::MoveRequest;
use super::stub::{make_base_wrapper, make_stub, BASE_WRAPPER_PREFIX};
use super::transform::naming::member_name_for;
use super::transform::{transform, TransformInput};
use crate::config::RelocatorConfig;
use crate::errors::{ErrorCode, RelocationError, Result};
use crate::syntax::modifiers::promote_to_internal;
use crate::syntax::{CompilationUnit, Member, MethodDecl, TypeDecl};
use crate::workspace::TypeIndex;
use std::path::Path;
use tracing::{debug, debug_span, warn};

pub struct RelocationContext<'a> {
    /// The file declaring the source type.
    pub unit: &'a CompilationUnit,
    pub path: &'a Path,
    pub index: &'a dyn TypeIndex,
    pub config: &'a RelocatorConfig,
    /// Indentation unit of the source file.
    pub indent: &'a str,
    /// Current declaration of the target type, wherever it lives.
    pub target: Option<&'a TypeDecl>,
}

/// Computes the source and target changes for one move. Nothing is merged
/// or written here; the caller decides where the results go.
pub fn relocate(ctx: &RelocationContext<'_>, request: &MoveRequest) -> Result<MoveOutcome> {
    let _span = debug_span!(
        "relocate",
        method = %request.method_name,
        source = %request.source_type,
        target = %request.target_type
    )
    .entered();

    if request.source_type == request.target_type {
        return Err(RelocationError::precondition(
            ErrorCode::TARGET_CONFLICT,
            format!(
                "cannot move '{}': '{}' is both the source and the target",
                request.method_name, request.source_type
            ),
        ));
    }

    let source = ctx
        .unit
        .find_type_declaring(&request.source_type, &request.method_name)
        .ok_or_else(|| RelocationError::type_not_found(&request.source_type, ctx.path))?;
    let method = find_method(&source, request, ctx.path)?;
    let source_path = ctx
        .unit
        .type_path(source.name())
        .unwrap_or_else(|| source.name().to_string());

    let catalog = build_catalog(&source, ctx.index);
    let method_profile = profile(&method, &catalog);
    let transformed = transform(&TransformInput {
        source: &source,
        source_path: &source_path,
        method: &method,
        catalog: &catalog,
        profile: &method_profile,
        request,
        receiver_name: &ctx.config.receiver_name,
    })?;

    let receiver_field = member_name_for(source.name());
    let (prepared_target, constructor_args) = if transformed.target_dependencies.is_empty() {
        // An existing injecting constructor is only usable when the source can
        // supply every argument.
        let fields = ctx.target.map(constructor_fields).unwrap_or_default();
        let supplied = fields
            .iter()
            .all(|field| *field == receiver_field || catalog.is_state(field));
        (None, if supplied { fields } else { Vec::new() })
    } else {
        let base = match ctx.target {
            Some(target) => target.clone(),
            None => new_class(&request.target_type)?,
        };
        let (prepared, fields) =
            inject_constructor_dependencies(&base, &transformed.target_dependencies, ctx.indent)?;
        (Some(prepared), fields)
    };

    let (mut updated, access_member, access) = if transformed.method.is_static() {
        (source.clone(), None, request.target_type.clone())
    } else {
        let constructor_initialized = !constructor_args.is_empty();
        let (updated, access) = ensure_access_member(
            &source,
            &request.target_type,
            request.access_member_name.as_deref(),
            request.access_member_kind,
            constructor_initialized,
        )?;
        if access.created && !constructor_initialized {
            if let Some(target) = ctx.target.filter(|t| !accepts_default_construction(t)) {
                return Err(RelocationError::precondition(
                    ErrorCode::TARGET_CONFLICT,
                    format!(
                        "cannot move '{}': '{}' has no parameterless constructor and '{}' \
                         can't supply the arguments of any other one",
                        request.method_name,
                        target.name(),
                        source.name()
                    ),
                ));
            }
        }
        let updated = if constructor_initialized {
            let args: Vec<String> = constructor_args
                .iter()
                .map(|field| {
                    if *field == receiver_field {
                        "this".to_string()
                    } else {
                        field.clone()
                    }
                })
                .collect();
            initialize_access_member(&updated, &access, &request.target_type, &args, ctx.indent)?
        } else {
            updated
        };
        let name = access.name.clone();
        (updated, Some(access), name)
    };

    let stub = make_stub(&method, &access, &transformed, ctx.indent)?;
    let mut members = updated.members();
    let position = members
        .iter()
        .position(|m| matches!(m, Member::Method(m) if *m == method))
        .ok_or_else(|| RelocationError::method_not_found(&request.method_name, source.name(), ctx.path))?;
    members.set(position, Member::Method(stub.clone()));

    let mut base_wrapper = None;
    if transformed.calls_base_implementation {
        let wrapper_name = format!("{BASE_WRAPPER_PREFIX}{}", method.name());
        let arity = method.params.params.len();
        let exists = members.iter().any(|m| {
            matches!(m, Member::Method(m) if m.name() == wrapper_name && m.params.params.len() == arity)
        });
        if exists {
            debug!(wrapper = %wrapper_name, "Reusing base wrapper");
        } else {
            let wrapper = make_base_wrapper(&method, ctx.indent)?;
            members.insert(position + 1, Member::Method(wrapper.clone()));
            base_wrapper = Some(wrapper);
        }
    }
    updated = updated.with_members(members);

    let mut warnings = transformed.warnings.clone();
    let exposed = expose_members(&mut updated, &transformed.exposed_members, &mut warnings);
    let stub_method = updated
        .methods()
        .find(|m| m.name() == method.name() && m.params.params.len() == method.params.params.len())
        .unwrap_or(stub);

    debug!(
        made_static = transformed.made_static,
        receiver = transformed.needs_receiver_parameter,
        exposed = ?exposed,
        "Move computed"
    );
    Ok(MoveOutcome {
        original_source: source.clone(),
        updated_source: updated,
        moved_method: transformed.method,
        stub_method,
        access_member,
        base_wrapper,
        prepared_target,
        needs_receiver_parameter: transformed.needs_receiver_parameter,
        made_static: transformed.made_static,
        injected: transformed.injected,
        target_dependencies: transformed.target_dependencies,
        namespace: ctx.unit.namespace_of(source.name()),
        exposed_members: exposed,
        warnings,
    })
}

fn find_method(source: &TypeDecl, request: &MoveRequest, path: &Path) -> Result<MethodDecl> {
    let mut candidates: Vec<MethodDecl> = source.methods_named(&request.method_name).collect();
    match candidates.len() {
        0 => Err(RelocationError::method_not_found(
            &request.method_name,
            source.name(),
            path,
        )),
        1 => Ok(candidates.remove(0)),
        n => Err(RelocationError::precondition(
            ErrorCode::AMBIGUOUS_OVERLOAD,
            format!(
                "cannot move '{}': '{}' declares {n} overloads with that name",
                request.method_name,
                source.name()
            ),
        )),
    }
}

/// Widens restricted members of `ty` named in `names` to internal. Overrides
/// keep their accessibility; a warning is recorded instead.
fn expose_members(
    ty: &mut TypeDecl,
    names: &std::collections::BTreeSet<String>,
    warnings: &mut Vec<String>,
) -> Vec<String> {
    let mut exposed = Vec::new();
    let mut members = ty.members();
    for index in 0..members.len() {
        let mut member = members[index].clone();
        let Some(name) = member
            .declared_names()
            .into_iter()
            .find(|n| names.contains(n))
        else {
            continue;
        };
        if member.modifiers().iter().any(|m| m.is("override")) {
            let message = format!(
                "'{name}' is an override; its accessibility can't be widened for the moved method"
            );
            warn!("{}", message);
            warnings.push(message);
            continue;
        }
        let promoted = match &mut member {
            Member::Method(m) => {
                let attributes = !m.attributes.is_empty();
                promote_to_internal(&mut m.modifiers, m.return_type.first_mut(), attributes)
            }
            Member::Field(f) => {
                let attributes = !f.attributes.is_empty();
                promote_to_internal(&mut f.modifiers, f.ty.first_mut(), attributes)
            }
            Member::Property(p) => {
                let attributes = !p.attributes.is_empty();
                promote_to_internal(&mut p.modifiers, p.ty.first_mut(), attributes)
            }
            Member::Type(t) => {
                let attributes = !t.attributes.is_empty();
                promote_to_internal(&mut t.modifiers, t.keywords.first_mut(), attributes)
            }
            Member::Delegate(d) => promote_to_internal(&mut d.modifiers, d.tokens.first_mut(), false),
            Member::Constructor(_) | Member::Other(_) => false,
        };
        if promoted {
            debug!(member = %name, "Widened source member to internal");
            members.set(index, member);
            if !exposed.contains(&name) {
                exposed.push(name);
            }
        }
    }
    *ty = ty.with_members(members);
    exposed
}
