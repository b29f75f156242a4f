use super::access::AccessMember;
use super::transform::{InjectedParameter, TargetDependency};
use crate::syntax::{MethodDecl, TypeDecl};

/// Everything one move produced, before anything is merged or written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    /// The source declaration as it was before the move.
    pub original_source: TypeDecl,
    /// The source with the stub, access member, wrapper and promotions.
    pub updated_source: TypeDecl,
    pub moved_method: MethodDecl,
    pub stub_method: MethodDecl,
    pub access_member: Option<AccessMember>,
    pub base_wrapper: Option<MethodDecl>,
    /// Target declaration amended with constructor dependencies. `None`
    /// when the move adds no target state.
    pub prepared_target: Option<TypeDecl>,
    pub needs_receiver_parameter: bool,
    pub made_static: bool,
    pub injected: Vec<InjectedParameter>,
    pub target_dependencies: Vec<TargetDependency>,
    /// Namespace of the source type.
    pub namespace: Option<String>,
    /// Source members whose accessibility was widened.
    pub exposed_members: Vec<String>,
    pub warnings: Vec<String>,
}
