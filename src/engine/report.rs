use crate::errors::{RelocationError, Result};
use crate::relocation::{MergeStatus, MoveOutcome};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovedMethod {
    pub name: String,
    pub made_static: bool,
    pub needs_receiver_parameter: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_member: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_wrapper: Option<String>,
    pub injected_parameters: Vec<String>,
    /// Fields added to the target for constructor-injected dependencies.
    pub target_fields: Vec<String>,
    pub exposed_members: Vec<String>,
    pub merge: MergeStatus,
    pub warnings: Vec<String>,
}

impl MovedMethod {
    pub(crate) fn from_outcome(outcome: &MoveOutcome, merge: MergeStatus) -> Self {
        Self {
            name: outcome.moved_method.name().to_string(),
            made_static: outcome.made_static,
            needs_receiver_parameter: outcome.needs_receiver_parameter,
            access_member: outcome.access_member.as_ref().map(|a| a.name.clone()),
            base_wrapper: outcome.base_wrapper.as_ref().map(|w| w.name().to_string()),
            injected_parameters: outcome.injected.iter().map(|p| p.parameter.clone()).collect(),
            target_fields: outcome
                .target_dependencies
                .iter()
                .map(|d| d.field.clone())
                .collect(),
            exposed_members: outcome.exposed_members.clone(),
            merge,
            warnings: outcome.warnings.clone(),
        }
    }

    pub fn note(&self) -> Option<&str> {
        match &self.merge {
            MergeStatus::NoOp { note } => Some(note),
            _ => None,
        }
    }
}

/// Result of one `move_methods` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveReport {
    pub source_file: PathBuf,
    pub target_file: PathBuf,
    pub source_type: String,
    pub target_type: String,
    /// Method names in the order they were moved.
    pub order: Vec<String>,
    pub moved: Vec<MovedMethod>,
    /// `(caller, callee)` calls ignored while ordering a cycle.
    pub cycle_edges: Vec<(String, String)>,
    pub created_target_file: bool,
}

impl MoveReport {
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let names: Vec<&str> = self.moved.iter().map(|m| m.name.as_str()).collect();
        let _ = write!(
            out,
            "Moved {} from {} to {} in {}",
            names.join(", "),
            self.source_type,
            self.target_type,
            self.target_file.display()
        );
        if self.created_target_file {
            out.push_str(" (new file)");
        }
        out.push('.');

        for method in &self.moved {
            if method.made_static {
                let _ = write!(out, "\n{} was made static.", method.name);
            }
            if let Some(note) = method.note() {
                let _ = write!(out, "\nNote: {note}.");
            }
            for warning in &method.warnings {
                let _ = write!(out, "\nWarning: {warning}.");
            }
        }
        out
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|err| {
            RelocationError::write(
                "<report>",
                std::io::Error::new(std::io::ErrorKind::InvalidData, err),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn method(name: &str, made_static: bool, merge: MergeStatus) -> MovedMethod {
        MovedMethod {
            name: name.to_string(),
            made_static,
            needs_receiver_parameter: false,
            access_member: None,
            base_wrapper: None,
            injected_parameters: vec![],
            target_fields: vec![],
            exposed_members: vec![],
            merge,
            warnings: vec![],
        }
    }

    fn report(moved: Vec<MovedMethod>) -> MoveReport {
        MoveReport {
            source_file: PathBuf::from("/src/A.cs"),
            target_file: PathBuf::from("/src/B.cs"),
            source_type: "A".to_string(),
            target_type: "B".to_string(),
            order: moved.iter().map(|m| m.name.clone()).collect(),
            moved,
            cycle_edges: vec![],
            created_target_file: true,
        }
    }

    #[test]
    fn summary_names_methods_file_and_static_hints() {
        let report = report(vec![
            method("Add", true, MergeStatus::Created),
            method("Sub", false, MergeStatus::NoOp {
                note: "'B' already declares 'Sub' with 1 parameter(s); left unchanged".to_string(),
            }),
        ]);
        assert_eq!(
            report.summary(),
            "Moved Add, Sub from A to B in /src/B.cs (new file).\n\
             Add was made static.\n\
             Note: 'B' already declares 'Sub' with 1 parameter(s); left unchanged."
        );
    }

    #[test]
    fn json_tags_merge_status() {
        let json = report(vec![method("Add", true, MergeStatus::Appended)])
            .to_json()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["moved"][0]["merge"]["status"], "appended");
        assert_eq!(value["moved"][0]["made_static"], true);
        assert!(value["moved"][0].get("access_member").is_none());
    }
}
