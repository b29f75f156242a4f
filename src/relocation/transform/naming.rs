//! Identifier derivation for generated parameters, fields and members.

use crate::syntax::scan::is_keyword;
use crate::syntax::Token;
use std::collections::BTreeSet;

/// `_total` → `total`, `m_Count` → `count`, `Repository` → `repository`.
pub fn lower_camel(name: &str) -> String {
    let bare = name.strip_prefix('@').unwrap_or(name);
    let bare = bare.strip_prefix("m_").unwrap_or(bare);
    let bare = bare.trim_start_matches('_');
    let mut chars = bare.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => "value".to_string(),
    }
}

/// Prefixes `@` when `name` is a reserved word.
pub fn escape_keyword(name: &str) -> String {
    if is_keyword(&Token::ident(name)) {
        format!("@{name}")
    } else {
        name.to_string()
    }
}

/// `base`, or `base2`, `base3`, ... when taken. Comparison ignores a
/// verbatim `@`.
pub fn unique_name(base: &str, taken: &BTreeSet<String>) -> String {
    let is_taken = |candidate: &str| {
        let bare = candidate.strip_prefix('@').unwrap_or(candidate);
        taken.contains(bare)
    };
    if !is_taken(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}{n}"))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Default name of the member through which one type reaches another:
/// `_` + lowerCamel(type).
pub fn member_name_for(type_name: &str) -> String {
    format!("_{}", lower_camel(type_name))
}

/// Parameter name for an injected source member.
pub fn parameter_name_for(member: &str, taken: &BTreeSet<String>) -> String {
    let escaped = escape_keyword(&lower_camel(member));
    unique_name(&escaped, taken)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_field_prefixes() {
        assert_eq!(lower_camel("_total"), "total");
        assert_eq!(lower_camel("m_Count"), "count");
        assert_eq!(lower_camel("Repository"), "repository");
        assert_eq!(lower_camel("__"), "value");
    }

    #[test]
    fn escapes_and_deduplicates() {
        let taken: BTreeSet<String> = ["event".to_string(), "event2".to_string()].into();
        assert_eq!(parameter_name_for("_event", &BTreeSet::new()), "@event");
        assert_eq!(parameter_name_for("_event", &taken), "@event3");
        assert_eq!(member_name_for("Billing"), "_billing");
    }
}
