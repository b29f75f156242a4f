use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How the source type holds its instance of the target type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMemberKind {
    #[default]
    Field,
    Property,
}

/// Name used in injection sets for the source instance itself.
pub const RECEIVER_DEPENDENCY: &str = "this";

/// One method to move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub source_type: String,
    pub method_name: String,
    pub target_type: String,
    pub access_member_name: Option<String>,
    #[serde(default)]
    pub access_member_kind: AccessMemberKind,
    /// Source members that become target fields set by a target constructor.
    #[serde(default)]
    pub constructor_injections: BTreeSet<String>,
    /// Source members passed to the moved method as extra parameters.
    #[serde(default)]
    pub parameter_injections: BTreeSet<String>,
}

impl MoveRequest {
    pub fn new(
        source_type: impl Into<String>,
        method_name: impl Into<String>,
        target_type: impl Into<String>,
    ) -> Self {
        Self {
            source_type: source_type.into(),
            method_name: method_name.into(),
            target_type: target_type.into(),
            access_member_name: None,
            access_member_kind: AccessMemberKind::Field,
            constructor_injections: BTreeSet::new(),
            parameter_injections: BTreeSet::new(),
        }
    }

    pub fn with_constructor_injections<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constructor_injections = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_parameter_injections<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameter_injections = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_access_member(mut self, name: Option<String>, kind: AccessMemberKind) -> Self {
        self.access_member_name = name;
        self.access_member_kind = kind;
        self
    }

    /// The source instance itself is handed to the target's constructor.
    pub fn injects_receiver(&self) -> bool {
        self.constructor_injections.contains(RECEIVER_DEPENDENCY)
    }

    /// Constructor injections other than the receiver.
    pub fn constructor_state(&self) -> impl Iterator<Item = &String> {
        self.constructor_injections
            .iter()
            .filter(|name| name.as_str() != RECEIVER_DEPENDENCY)
    }
}
