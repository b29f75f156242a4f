//! Rewrites a method so it compiles in another type.
//!
//! The transformer is a state machine over a fixed sequence of stages:
//!
//! ```text
//! Validate -> InjectParameters -> AddReceiverParameter? -> RewriteBody
//!   -> AddInjectedParameters -> QualifyNestedTypes -> DemoteStaticIfPossible
//!   -> NormalizeVisibility -> Shrink? -> ExposeSourceMembers
//! ```
//!
//! The body is scanned once up front. Body stages claim token ranges in an
//! [`EditSet`](rewrite::EditSet); injected dependencies claim first, so the
//! receiver rewrite never touches a reference that became a parameter. The
//! claims are applied together once the last body stage has run.

pub mod naming;
pub mod rewrite;
pub mod signature;

use self::naming::{member_name_for, parameter_name_for, unique_name};
use self::rewrite::{member_access, EditSet};
use super::catalog::MemberCatalog;
use super::profile::{shadowing_names, MethodProfile};
use super::request::{MoveRequest, RECEIVER_DEPENDENCY};
use crate::errors::{ErrorCode, RelocationError, Result};
use crate::syntax::modifiers::{insert_modifier, promote_to_internal};
use crate::syntax::scan::is_member_operator;
use crate::syntax::{scan, BodyScan, MethodDecl, Occurrence, OccurrenceKind, Token, TypeDecl};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, debug_span, warn};

/// A source member passed to the moved method as a parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InjectedParameter {
    pub member: String,
    pub parameter: String,
    pub type_text: String,
    /// The body writes the member, so it is passed by `ref`.
    pub by_ref: bool,
}

/// State the target type must hold, set through its constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetDependency {
    pub field: String,
    pub type_text: String,
}

pub struct TransformInput<'a> {
    pub source: &'a TypeDecl,
    /// How code outside the source type names it, e.g. `Outer.Inner`.
    pub source_path: &'a str,
    pub method: &'a MethodDecl,
    pub catalog: &'a MemberCatalog,
    pub profile: &'a MethodProfile,
    pub request: &'a MoveRequest,
    pub receiver_name: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    pub method: MethodDecl,
    pub needs_receiver_parameter: bool,
    pub made_static: bool,
    /// The body called its own base implementation; the source needs a
    /// `Base<Name>` wrapper.
    pub calls_base_implementation: bool,
    pub injected: Vec<InjectedParameter>,
    pub target_dependencies: Vec<TargetDependency>,
    /// Target field holding the source instance, when `this` is
    /// constructor-injected.
    pub receiver_field: Option<String>,
    /// Restricted source members the moved body now reaches from outside.
    pub exposed_members: BTreeSet<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    InjectParameters,
    AddReceiverParameter,
    RewriteBody,
    AddInjectedParameters,
    QualifyNestedTypes,
    DemoteStaticIfPossible,
    NormalizeVisibility,
    Shrink,
    ExposeSourceMembers,
    Done,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Validate => "validate",
            Stage::InjectParameters => "inject_parameters",
            Stage::AddReceiverParameter => "add_receiver_parameter",
            Stage::RewriteBody => "rewrite_body",
            Stage::AddInjectedParameters => "add_injected_parameters",
            Stage::QualifyNestedTypes => "qualify_nested_types",
            Stage::DemoteStaticIfPossible => "demote_static_if_possible",
            Stage::NormalizeVisibility => "normalize_visibility",
            Stage::Shrink => "shrink",
            Stage::ExposeSourceMembers => "expose_source_members",
            Stage::Done => "done",
        }
    }
}

pub fn transform(input: &TransformInput<'_>) -> Result<Transformed> {
    let _span = debug_span!(
        "transform",
        method = input.method.name(),
        source = input.source.name()
    )
    .entered();
    Transformer::new(input).run()
}

struct Transformer<'a> {
    input: &'a TransformInput<'a>,
    method: MethodDecl,
    code: Vec<Token>,
    body: BodyScan,
    shadowed: BTreeSet<String>,
    edits: EditSet,
    receiver: Option<String>,
    receiver_param_added: bool,
    receiver_used: bool,
    uses_target_state: bool,
    calls_base_implementation: bool,
    made_static: bool,
    injected: Vec<InjectedParameter>,
    target_dependencies: Vec<TargetDependency>,
    receiver_field: Option<String>,
    reached_members: BTreeSet<String>,
    exposed_members: BTreeSet<String>,
    warnings: Vec<String>,
}

impl<'a> Transformer<'a> {
    fn new(input: &'a TransformInput<'a>) -> Self {
        let method = input.method.clone();
        let code = method.body.code().to_vec();
        let body = scan(&code);
        let shadowed = shadowing_names(&method);
        Self {
            input,
            method,
            code,
            body,
            shadowed,
            edits: EditSet::new(),
            receiver: None,
            receiver_param_added: false,
            receiver_used: false,
            uses_target_state: false,
            calls_base_implementation: false,
            made_static: false,
            injected: Vec::new(),
            target_dependencies: Vec::new(),
            receiver_field: None,
            reached_members: BTreeSet::new(),
            exposed_members: BTreeSet::new(),
            warnings: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Transformed> {
        let mut stage = Stage::Validate;
        while stage != Stage::Done {
            let _span = debug_span!("stage", stage = stage.name()).entered();
            stage = self.step(stage)?;
        }
        Ok(Transformed {
            method: self.method,
            needs_receiver_parameter: self.receiver_param_added,
            made_static: self.made_static,
            calls_base_implementation: self.calls_base_implementation,
            injected: self.injected,
            target_dependencies: self.target_dependencies,
            receiver_field: self.receiver_field,
            exposed_members: self.exposed_members,
            warnings: self.warnings,
        })
    }

    fn step(&mut self, stage: Stage) -> Result<Stage> {
        let next = match stage {
            Stage::Validate => {
                self.validate()?;
                Stage::InjectParameters
            }
            Stage::InjectParameters => {
                self.inject_parameters()?;
                if self.input.profile.needs_receiver() || self.receiver_field.is_some() {
                    Stage::AddReceiverParameter
                } else {
                    Stage::RewriteBody
                }
            }
            Stage::AddReceiverParameter => {
                self.add_receiver_parameter();
                Stage::RewriteBody
            }
            Stage::RewriteBody => {
                self.rewrite_body();
                Stage::AddInjectedParameters
            }
            Stage::AddInjectedParameters => {
                self.add_injected_parameters();
                Stage::QualifyNestedTypes
            }
            Stage::QualifyNestedTypes => {
                self.qualify_nested_types();
                Stage::DemoteStaticIfPossible
            }
            Stage::DemoteStaticIfPossible => {
                self.demote_static_if_possible();
                Stage::NormalizeVisibility
            }
            Stage::NormalizeVisibility => {
                self.normalize_visibility();
                if self.receiver_param_added {
                    Stage::Shrink
                } else {
                    Stage::ExposeSourceMembers
                }
            }
            Stage::Shrink => {
                self.shrink();
                Stage::ExposeSourceMembers
            }
            Stage::ExposeSourceMembers => {
                self.expose_source_members();
                Stage::Done
            }
            Stage::Done => Stage::Done,
        };
        Ok(next)
    }

    fn method_name(&self) -> &str {
        self.input.method.name()
    }

    fn source_name(&self) -> &str {
        self.input.source.name()
    }

    fn validate(&self) -> Result<()> {
        let method = self.input.method;
        let name = self.method_name();
        if !method.body.has_code() {
            return Err(RelocationError::precondition(
                ErrorCode::NO_BODY,
                format!("cannot move '{name}': it has no body to move"),
            ));
        }
        if method.has_modifier("override") && method.visibility().is_restricted() {
            return Err(RelocationError::precondition(
                ErrorCode::RESTRICTED_OVERRIDE,
                format!(
                    "cannot move '{name}' out of '{}': an override with restricted accessibility \
                     has to stay in the type that overrides it",
                    self.source_name()
                ),
            ));
        }
        if self.input.source.is_generic() {
            return Err(RelocationError::unsupported(
                name,
                format!("'{}' is generic and can't be named as a receiver type", self.source_name()),
            ));
        }

        let request = self.input.request;
        for dependency in request.constructor_state() {
            self.check_dependency(dependency)?;
        }
        for dependency in &request.parameter_injections {
            if dependency == RECEIVER_DEPENDENCY {
                return Err(RelocationError::precondition(
                    ErrorCode::UNKNOWN_DEPENDENCY,
                    format!("cannot move '{name}': 'this' can only be injected through the constructor"),
                ));
            }
            if request.constructor_injections.contains(dependency) {
                return Err(RelocationError::unsupported(
                    name,
                    format!("'{dependency}' is injected both through the constructor and as a parameter"),
                ));
            }
            self.check_dependency(dependency)?;
        }

        for occurrence in self.body.of_kind(OccurrenceKind::BaseMember) {
            let overridden = occurrence.name != name
                && self
                    .input
                    .source
                    .methods_named(&occurrence.name)
                    .any(|m| m.has_modifier("override"));
            if overridden {
                return Err(RelocationError::unsupported(
                    name,
                    format!(
                        "base.{} would reach the override in '{}' once it goes through the receiver",
                        occurrence.name,
                        self.source_name()
                    ),
                ));
            }
        }
        Ok(())
    }

    fn check_dependency(&self, dependency: &str) -> Result<()> {
        if self.input.catalog.is_state(dependency) {
            Ok(())
        } else {
            Err(RelocationError::precondition(
                ErrorCode::UNKNOWN_DEPENDENCY,
                format!(
                    "cannot move '{}': '{dependency}' is not a field or property of '{}'",
                    self.method_name(),
                    self.source_name()
                ),
            ))
        }
    }

    /// Occurrences that name a member of the source type.
    fn member_references(&self) -> Vec<Occurrence> {
        self.body
            .occurrences
            .iter()
            .filter(|o| match o.kind {
                OccurrenceKind::ThisMember => true,
                OccurrenceKind::SimpleName => !o.local && !self.shadowed.contains(&o.name),
                _ => false,
            })
            .cloned()
            .collect()
    }

    fn reference_range(occurrence: &Occurrence) -> (usize, usize) {
        match occurrence.kind {
            OccurrenceKind::ThisMember => (occurrence.index - 2, occurrence.index + 1),
            _ => (occurrence.index, occurrence.index + 1),
        }
    }

    fn taken_names(&self) -> BTreeSet<String> {
        let mut taken = self.shadowed.clone();
        taken.extend(self.body.locals.iter().cloned());
        taken.extend(
            self.injected
                .iter()
                .map(|i| i.parameter.trim_start_matches('@').to_string()),
        );
        taken
    }

    fn inject_parameters(&mut self) -> Result<()> {
        let request = self.input.request;
        let catalog = self.input.catalog;
        let references = self.member_references();

        let mut wanted: BTreeSet<String> = self
            .input
            .profile
            .used_private_fields
            .iter()
            .filter(|field| !request.constructor_injections.contains(*field))
            .cloned()
            .collect();
        wanted.extend(request.parameter_injections.iter().cloned());

        let mut ordered: Vec<String> = Vec::new();
        for occurrence in &references {
            if wanted.contains(&occurrence.name) && !ordered.contains(&occurrence.name) {
                ordered.push(occurrence.name.clone());
            }
        }
        for dependency in &wanted {
            if !ordered.contains(dependency) {
                ordered.push(dependency.clone());
            }
        }

        for member in ordered {
            self.check_dependency(&member)?;
            let type_text = catalog.member_types.get(&member).cloned().unwrap_or_default();
            let uses: Vec<&Occurrence> = references.iter().filter(|o| o.name == member).collect();
            let by_ref = uses.iter().any(|o| o.written);
            if by_ref && catalog.property_names.contains(&member) {
                return Err(RelocationError::unsupported(
                    self.method_name(),
                    format!("property '{member}' is assigned in the body and can't be passed by reference"),
                ));
            }
            if by_ref && self.input.method.is_async() {
                return Err(RelocationError::unsupported(
                    self.method_name(),
                    format!("async methods can't take ref parameters, and the body assigns '{member}'"),
                ));
            }

            let parameter = parameter_name_for(&member, &self.taken_names());
            for occurrence in uses {
                let (start, end) = Self::reference_range(occurrence);
                self.edits.claim(start, end, vec![Token::ident(parameter.clone())]);
            }
            debug!(member = %member, parameter = %parameter, by_ref, "Injecting dependency as parameter");
            self.injected.push(InjectedParameter {
                member,
                parameter,
                type_text,
                by_ref,
            });
        }

        for member in request.constructor_state() {
            for occurrence in references.iter().filter(|o| &o.name == member) {
                let (start, end) = Self::reference_range(occurrence);
                self.edits.keep(&self.code, start, end);
                self.uses_target_state = true;
            }
            let type_text = catalog.member_types.get(member).cloned().unwrap_or_default();
            debug!(member = %member, "Injecting dependency through the target constructor");
            self.target_dependencies.push(TargetDependency {
                field: member.clone(),
                type_text,
            });
        }

        if request.injects_receiver() {
            let field = member_name_for(self.source_name());
            self.target_dependencies.push(TargetDependency {
                field: field.clone(),
                type_text: self.input.source_path.to_string(),
            });
            self.receiver_field = Some(field);
        }
        Ok(())
    }

    fn add_receiver_parameter(&mut self) {
        if let Some(field) = &self.receiver_field {
            self.receiver = Some(field.clone());
            return;
        }
        let name = unique_name(self.input.receiver_name, &self.taken_names());
        self.method
            .params
            .insert(0, signature::receiver_param(self.input.source_path, &name));
        debug!(receiver = %name, "Added receiver parameter");
        self.receiver = Some(name);
        self.receiver_param_added = true;
    }

    fn use_receiver(&mut self) {
        self.receiver_used = true;
        if self.receiver_field.is_some() {
            self.uses_target_state = true;
        }
    }

    fn rewrite_body(&mut self) {
        let catalog = self.input.catalog;
        let own = self.method_name().to_string();
        let is_static = self.input.method.is_static();
        let source_path = self.input.source_path;
        let occurrences = self.body.occurrences.clone();

        for occurrence in &occurrences {
            let i = occurrence.index;
            if self.edits.is_claimed(i) {
                continue;
            }
            let name = occurrence.name.as_str();
            match occurrence.kind {
                OccurrenceKind::Receiver => {
                    if let Some(receiver) = self.receiver.clone() {
                        self.edits.claim(i, i + 1, vec![Token::ident(receiver)]);
                        self.use_receiver();
                    }
                }
                OccurrenceKind::ThisMember => {
                    if let Some(receiver) = self.receiver.clone() {
                        self.edits.claim(i - 2, i - 1, vec![Token::ident(receiver)]);
                        self.use_receiver();
                        self.reached_members.insert(name.to_string());
                    }
                }
                OccurrenceKind::BaseMember => {
                    if let Some(receiver) = self.receiver.clone() {
                        if occurrence.invoked && name == own {
                            self.edits.claim(
                                i - 2,
                                i + 1,
                                vec![
                                    Token::ident(receiver),
                                    Token::punct("."),
                                    Token::ident(format!("Base{name}")),
                                ],
                            );
                            self.calls_base_implementation = true;
                        } else {
                            self.edits.claim(i - 2, i - 1, vec![Token::ident(receiver)]);
                            self.reached_members.insert(name.to_string());
                        }
                        self.use_receiver();
                    }
                }
                OccurrenceKind::SimpleName if !occurrence.local && !self.shadowed.contains(name) => {
                    if catalog.is_instance_member(name) && !is_static {
                        if let Some(receiver) = self.receiver.clone() {
                            let replacement = member_access(&receiver, &self.code[i]);
                            self.edits.claim(i, i + 1, replacement);
                            self.use_receiver();
                            self.reached_members.insert(name.to_string());
                        }
                    } else if catalog.is_static_member(name)
                        && !(is_static && occurrence.invoked && name == own)
                    {
                        let replacement = member_access(source_path, &self.code[i]);
                        self.edits.claim(i, i + 1, replacement);
                        self.reached_members.insert(name.to_string());
                    }
                }
                OccurrenceKind::MemberAccess => {
                    let qualified_by_source = i >= 2
                        && self.code[i - 2].is_ident()
                        && self.code[i - 2].ident_name() == self.source_name()
                        && !(i >= 3 && is_member_operator(&self.code[i - 3]));
                    if qualified_by_source {
                        self.reached_members.insert(name.to_string());
                    }
                }
                _ => {}
            }
        }
        debug!(edits = self.edits.len(), receiver_used = self.receiver_used, "Body rewritten");
    }

    fn add_injected_parameters(&mut self) {
        let position = signature::injection_position(&self.method, self.receiver_param_added);
        for (offset, injected) in self.injected.iter().enumerate() {
            self.method
                .params
                .insert(position + offset, signature::injected_param(injected));
        }
    }

    fn qualify_nested_types(&mut self) {
        let catalog = self.input.catalog;
        let source_path = self.input.source_path;
        let occurrences = self.body.occurrences.clone();
        for occurrence in &occurrences {
            let i = occurrence.index;
            let name = occurrence.name.as_str();
            let nested_reference = occurrence.kind == OccurrenceKind::SimpleName
                && !occurrence.local
                && !self.shadowed.contains(name)
                && catalog.nested_type_names.contains(name)
                && !catalog.is_instance_member(name)
                && !catalog.is_static_member(name);
            if nested_reference && !self.edits.is_claimed(i) {
                let replacement = member_access(source_path, &self.code[i]);
                self.edits.claim(i, i + 1, replacement);
                self.reached_members.insert(name.to_string());
            }
        }
        let qualified =
            signature::qualify_nested_types(&mut self.method, &catalog.nested_type_names, source_path);
        self.reached_members.extend(qualified);

        let edits = std::mem::take(&mut self.edits);
        let code = edits.apply(&self.code);
        self.method.body = self.method.body.with_code(code);
    }

    fn demote_static_if_possible(&mut self) {
        if self.method.is_static() || self.receiver_used || self.uses_target_state {
            return;
        }
        if ["virtual", "override", "abstract"]
            .iter()
            .any(|m| self.method.has_modifier(m))
        {
            debug!("Method is part of an override chain; staying an instance method");
            return;
        }
        let attributes_present = !self.method.attributes.is_empty();
        insert_modifier(
            &mut self.method.modifiers,
            "static",
            false,
            self.method.return_type.first_mut(),
            attributes_present,
        );
        self.made_static = true;
        debug!("Method made static");
    }

    fn normalize_visibility(&mut self) {
        let attributes_present = !self.method.attributes.is_empty();
        let promoted = promote_to_internal(
            &mut self.method.modifiers,
            self.method.return_type.first_mut(),
            attributes_present,
        );
        if promoted {
            debug!(visibility = ?self.method.visibility(), "Widened accessibility");
        }
    }

    fn shrink(&mut self) {
        if self.receiver_param_added && !self.receiver_used {
            self.method.params.remove(0);
            self.receiver_param_added = false;
            debug!("Receiver parameter unused; removed");
        }
    }

    fn expose_source_members(&mut self) {
        let catalog = self.input.catalog;
        for name in &self.reached_members {
            if let Some(visibility) = catalog.declared_visibility.get(name) {
                if visibility.is_restricted() {
                    self.exposed_members.insert(name.clone());
                }
            } else if let Some(visibility) = catalog.inherited_visibility.get(name) {
                if visibility.is_restricted() {
                    let message = format!(
                        "'{name}' is inherited by '{}' with {visibility:?} accessibility and \
                         can't be reached from the moved '{}'",
                        self.source_name(),
                        self.method_name()
                    );
                    warn!("{}", message);
                    self.warnings.push(message);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relocation::catalog::build_catalog;
    use crate::relocation::profile::profile;
    use crate::syntax::parse_compilation_unit;
    use crate::workspace::UnitIndex;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn run(source: &str, request: MoveRequest) -> Result<Transformed> {
        let unit = parse_compilation_unit(source).unwrap();
        let ty = unit.find_type(&request.source_type).unwrap();
        let method = ty.methods_named(&request.method_name).next().unwrap();
        let catalog = build_catalog(&ty, &UnitIndex::new([&unit]));
        let profile = profile(&method, &catalog);
        transform(&TransformInput {
            source: &ty,
            source_path: ty.name(),
            method: &method,
            catalog: &catalog,
            profile: &profile,
            request: &request,
            receiver_name: "@this",
        })
    }

    const SOURCE: &str = indoc! {"
        class A : Base
        {
            private int Val = 1;
            private int count;
            int Limit { get; set; }
            static int Scale = 3;
            class Node {}

            public int Add(int x) { return x + Val; }
            void Bump() { count++; }
            int Capped(int x) { return Math.Min(x, Limit) * Scale; }
            Node Make(Node parent) { return new Node(); }
            public override int Foo() { return base.Foo() + Limit; }
            protected override void Hidden() { }
            public A Self() { return this; }
            int Fact(int n) { return n <= 1 ? 1 : n * Fact(n - 1); }
        }
        class Base
        {
            public virtual int Foo() { return 1; }
            protected virtual void Hidden() { }
        }
    "};

    #[test]
    fn injects_private_fields_and_demotes_to_static() {
        let result = run(
            SOURCE,
            MoveRequest::new("A", "Add", "B").with_parameter_injections(["Val"]),
        )
        .unwrap();
        assert_eq!(
            result.method.to_source().trim(),
            "public static int Add(int val, int x) { return x + val; }"
        );
        assert!(result.made_static);
        assert!(!result.needs_receiver_parameter);
        assert_eq!(result.injected[0].member, "Val");
    }

    #[test]
    fn written_fields_become_ref_parameters() {
        let result = run(SOURCE, MoveRequest::new("A", "Bump", "B")).unwrap();
        assert_eq!(
            result.method.to_source().trim(),
            "internal static void Bump(ref int count) { count++; }"
        );
        assert!(result.injected[0].by_ref);
    }

    #[test]
    fn instance_state_goes_through_the_receiver() {
        let result = run(SOURCE, MoveRequest::new("A", "Capped", "B")).unwrap();
        assert_eq!(
            result.method.to_source().trim(),
            "internal int Capped(A @this, int x) { return Math.Min(x, @this.Limit) * A.Scale; }"
        );
        assert!(result.needs_receiver_parameter);
        assert!(!result.made_static);
        assert_eq!(
            result.exposed_members,
            ["Limit", "Scale"].iter().map(|s| s.to_string()).collect()
        );
    }

    #[test]
    fn nested_types_are_qualified() {
        let result = run(SOURCE, MoveRequest::new("A", "Make", "B")).unwrap();
        assert_eq!(
            result.method.to_source().trim(),
            "internal static A.Node Make(A.Node parent) { return new A.Node(); }"
        );
        assert!(result.exposed_members.contains("Node"));
    }

    #[test]
    fn base_calls_go_through_a_wrapper() {
        let result = run(SOURCE, MoveRequest::new("A", "Foo", "B")).unwrap();
        assert!(result.calls_base_implementation);
        assert!(!result.made_static);
        assert_eq!(
            result.method.to_source().trim(),
            "public override int Foo(A @this) { return @this.BaseFoo() + @this.Limit; }"
        );
    }

    #[test]
    fn restricted_overrides_are_rejected() {
        let err = run(SOURCE, MoveRequest::new("A", "Hidden", "B")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::RESTRICTED_OVERRIDE);
        assert!(err.to_string().contains("Hidden"));
    }

    #[test]
    fn bare_this_and_recursion_use_the_receiver() {
        let result = run(SOURCE, MoveRequest::new("A", "Self", "B")).unwrap();
        assert_eq!(
            result.method.to_source().trim(),
            "public A Self(A @this) { return @this; }"
        );
        let result = run(SOURCE, MoveRequest::new("A", "Fact", "B")).unwrap();
        assert!(result.method.to_source().contains("n * @this.Fact(n - 1)"));
        assert!(result.exposed_members.contains("Fact"));
    }

    #[test]
    fn constructor_injection_keeps_an_instance_method() {
        let result = run(
            SOURCE,
            MoveRequest::new("A", "Capped", "B").with_constructor_injections(["Limit"]),
        )
        .unwrap();
        assert!(!result.made_static);
        assert!(!result.needs_receiver_parameter);
        assert_eq!(
            result.method.to_source().trim(),
            "internal int Capped(int x) { return Math.Min(x, Limit) * A.Scale; }"
        );
        assert_eq!(
            result.target_dependencies,
            vec![TargetDependency {
                field: "Limit".into(),
                type_text: "int".into()
            }]
        );
    }

    #[test]
    fn injecting_the_receiver_uses_a_target_field() {
        let result = run(
            SOURCE,
            MoveRequest::new("A", "Self", "B").with_constructor_injections(["this"]),
        )
        .unwrap();
        assert_eq!(result.receiver_field.as_deref(), Some("_a"));
        assert_eq!(
            result.method.to_source().trim(),
            "public A Self() { return _a; }"
        );
    }

    #[test]
    fn unknown_dependencies_are_rejected() {
        let err = run(
            SOURCE,
            MoveRequest::new("A", "Add", "B").with_parameter_injections(["Missing"]),
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UNKNOWN_DEPENDENCY);
    }
}
