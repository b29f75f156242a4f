use crate::relocation::AccessMemberKind;
use crate::syntax::scan::is_keyword;
use crate::syntax::{detect_indent, FormatOptions, Token};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_RECEIVER_NAME: &str = "@this";

/// Settings read from `.relocator.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelocatorConfig {
    /// Name of the parameter that replaces the implicit receiver.
    pub receiver_name: String,
    pub default_access_member_kind: AccessMemberKind,
    pub indent: IndentStyle,
    pub blank_line_between_members: bool,
    pub new_file_namespace_style: NamespaceStyle,
}

impl Default for RelocatorConfig {
    fn default() -> Self {
        Self {
            receiver_name: DEFAULT_RECEIVER_NAME.to_string(),
            default_access_member_kind: AccessMemberKind::Field,
            indent: IndentStyle::Auto,
            blank_line_between_members: true,
            new_file_namespace_style: NamespaceStyle::Match,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndentStyle {
    /// Use whatever the document already uses.
    Auto,
    Spaces(usize),
    Tabs,
}

impl IndentStyle {
    pub fn unit_for(&self, source: &str) -> String {
        match self {
            IndentStyle::Auto => detect_indent(source),
            IndentStyle::Spaces(width) => " ".repeat(*width),
            IndentStyle::Tabs => "\t".to_string(),
        }
    }
}

/// Namespace declaration style for newly created target files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NamespaceStyle {
    /// Same style as the source file.
    Match,
    Block,
    FileScoped,
}

impl RelocatorConfig {
    pub fn format_options(&self, source: &str) -> FormatOptions {
        FormatOptions {
            indent: self.indent.unit_for(source),
            blank_line_between_members: self.blank_line_between_members,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum IndentSetting {
    Width(i64),
    Named(String),
}

/// The file as written, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawConfig {
    pub receiver_name: Option<String>,
    pub default_access_member_kind: Option<String>,
    pub indent: Option<IndentSetting>,
    pub blank_line_between_members: Option<bool>,
    pub new_file_namespace_style: Option<String>,
}

impl RawConfig {
    /// Validates each setting, keeping the default for any invalid value.
    pub fn resolve(self) -> RelocatorConfig {
        let defaults = RelocatorConfig::default();

        let receiver_name = match self.receiver_name {
            Some(name) if is_valid_receiver(&name) => name,
            Some(name) => {
                warn!(value = %name, "Invalid receiver_name; using {}", DEFAULT_RECEIVER_NAME);
                defaults.receiver_name
            }
            None => defaults.receiver_name,
        };

        let default_access_member_kind = match self.default_access_member_kind.as_deref() {
            None => defaults.default_access_member_kind,
            Some("field") => AccessMemberKind::Field,
            Some("property") => AccessMemberKind::Property,
            Some(other) => {
                warn!(value = other, "Invalid default_access_member_kind; using field");
                defaults.default_access_member_kind
            }
        };

        let indent = match self.indent {
            None => defaults.indent,
            Some(IndentSetting::Width(width)) if (1..=16).contains(&width) => {
                IndentStyle::Spaces(width as usize)
            }
            Some(IndentSetting::Named(name)) if name == "auto" => IndentStyle::Auto,
            Some(IndentSetting::Named(name)) if name == "tabs" => IndentStyle::Tabs,
            Some(other) => {
                warn!(value = ?other, "Invalid indent; using auto");
                defaults.indent
            }
        };

        let new_file_namespace_style = match self.new_file_namespace_style.as_deref() {
            None | Some("match") => NamespaceStyle::Match,
            Some("block") => NamespaceStyle::Block,
            Some("file_scoped") => NamespaceStyle::FileScoped,
            Some(other) => {
                warn!(value = other, "Invalid new_file_namespace_style; using match");
                defaults.new_file_namespace_style
            }
        };

        RelocatorConfig {
            receiver_name,
            default_access_member_kind,
            indent,
            blank_line_between_members: self
                .blank_line_between_members
                .unwrap_or(defaults.blank_line_between_members),
            new_file_namespace_style,
        }
    }
}

fn is_valid_receiver(name: &str) -> bool {
    let bare = name.strip_prefix('@').unwrap_or(name);
    let mut chars = bare.chars();
    let starts_well = chars
        .next()
        .is_some_and(|c| c == '_' || c.is_alphabetic());
    starts_well
        && chars.all(|c| c == '_' || c.is_alphanumeric())
        && !is_keyword(&Token::ident(name))
}
