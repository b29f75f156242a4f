//! The method relocation pipeline.
//!
//! For one method: [`build_catalog`] → [`profile`] → [`transform`] →
//! [`make_stub`] / [`make_base_wrapper`] → [`merge_into`]. Batches are put in
//! callee-first order by [`order`] before any method runs through it, and the
//! [`MoveLedger`] keeps a stub from being moved a second time.

pub mod access;
pub mod catalog;
pub mod ledger;
pub mod merge;
pub mod ordering;
pub mod outcome;
pub mod profile;
pub mod relocate;
pub mod request;
pub mod resolver;
pub mod stub;
pub mod transform;

pub use access::{
    ensure_access_member, initialize_access_member, inject_constructor_dependencies, AccessMember,
};
pub use catalog::{build_catalog, MemberCatalog};
pub use ledger::MoveLedger;
pub use merge::{add_using, merge_into, new_file_unit, propagate_usings, MergeStatus};
pub use ordering::{order, OrderResult};
pub use outcome::MoveOutcome;
pub use profile::{profile, MethodProfile};
pub use relocate::{relocate, RelocationContext};
pub use request::{AccessMemberKind, MoveRequest, RECEIVER_DEPENDENCY};
pub use resolver::{BatchEntry, CallResolver, NameResolver, WorkspaceResolver};
pub use stub::{make_base_wrapper, make_stub};
pub use transform::{transform, InjectedParameter, TargetDependency, TransformInput, Transformed};
