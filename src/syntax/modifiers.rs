//! Declaration modifiers and accessibility.

use super::token::Token;
use serde::Serialize;

/// Keywords accepted in a member's modifier list.
pub const MODIFIER_KEYWORDS: &[&str] = &[
    "public", "private", "protected", "internal", "file", "static", "readonly", "const",
    "virtual", "override", "abstract", "sealed", "new", "async", "extern", "unsafe",
    "volatile", "partial", "required", "event", "fixed",
];

const ACCESS_KEYWORDS: &[&str] = &["public", "private", "protected", "internal", "file"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Visibility {
    Public,
    Internal,
    ProtectedInternal,
    Protected,
    PrivateProtected,
    Private,
    /// No access modifier; private for members.
    Implicit,
}

impl Visibility {
    pub fn from_modifiers(modifiers: &[Token]) -> Self {
        let has = |m: &str| modifiers.iter().any(|t| t.is(m));
        match (has("public"), has("internal"), has("protected"), has("private")) {
            (true, _, _, _) => Visibility::Public,
            (_, true, true, _) => Visibility::ProtectedInternal,
            (_, true, _, _) => Visibility::Internal,
            (_, _, true, true) => Visibility::PrivateProtected,
            (_, _, true, _) => Visibility::Protected,
            (_, _, _, true) => Visibility::Private,
            _ if has("file") => Visibility::Internal,
            _ => Visibility::Implicit,
        }
    }

    /// Whether code in another type of the same assembly can reach the member.
    pub fn is_reachable_from_other_types(self) -> bool {
        matches!(
            self,
            Visibility::Public | Visibility::Internal | Visibility::ProtectedInternal
        )
    }

    pub fn is_private(self) -> bool {
        matches!(self, Visibility::Private | Visibility::Implicit)
    }

    /// Restricted accessibility: narrower than internal.
    pub fn is_restricted(self) -> bool {
        !self.is_reachable_from_other_types()
    }

    /// Rank used to check that promotions never narrow accessibility.
    pub fn rank(self) -> u8 {
        match self {
            Visibility::Private | Visibility::Implicit => 0,
            Visibility::PrivateProtected => 1,
            Visibility::Protected => 2,
            Visibility::Internal => 3,
            Visibility::ProtectedInternal => 4,
            Visibility::Public => 5,
        }
    }
}

pub fn has_modifier(modifiers: &[Token], keyword: &str) -> bool {
    modifiers.iter().any(|m| m.is(keyword))
}

/// Removes `keyword` from a modifier list. When the removed token carried the
/// declaration's leading trivia, `next_first` receives it.
pub fn remove_modifier(modifiers: &mut Vec<Token>, keyword: &str, next_first: Option<&mut Token>) {
    let Some(index) = modifiers.iter().position(|m| m.is(keyword)) else {
        return;
    };
    let removed = modifiers.remove(index);
    if index == 0 {
        let target = match modifiers.first_mut() {
            Some(first) => Some(first),
            None => next_first,
        };
        if let Some(target) = target {
            target.leading = removed.leading;
        }
    }
}

/// Inserts `keyword` into a modifier list after any access modifiers (or
/// before everything when `access` is set). `next_first` is the first token
/// after the modifiers; it hands over its trivia when the list was empty.
pub fn insert_modifier(
    modifiers: &mut Vec<Token>,
    keyword: &str,
    access: bool,
    next_first: Option<&mut Token>,
    attributes_present: bool,
) {
    if has_modifier(modifiers, keyword) {
        return;
    }
    let index = if access {
        0
    } else {
        modifiers
            .iter()
            .take_while(|m| ACCESS_KEYWORDS.iter().any(|a| m.is(a)))
            .count()
    };
    let mut token = Token::ident(keyword);
    if index == 0 {
        let displaced = match modifiers.first_mut() {
            Some(first) => Some(first),
            None => next_first,
        };
        match displaced {
            Some(next) => {
                token.leading = std::mem::replace(&mut next.leading, " ".to_string());
                if attributes_present && token.leading.is_empty() {
                    token.leading = " ".to_string();
                }
            }
            None => token.leading = " ".to_string(),
        }
    } else {
        token.leading = " ".to_string();
    }
    modifiers.insert(index, token);
}

/// Promotes a modifier list so that other types in the assembly can reach
/// the declaration. Accessibility only ever widens: `private` and implicit
/// become `internal`, `protected` gains `internal`. Other modifiers,
/// including `override`, are left untouched.
pub fn promote_to_internal(
    modifiers: &mut Vec<Token>,
    next_first: Option<&mut Token>,
    attributes_present: bool,
) -> bool {
    match Visibility::from_modifiers(modifiers) {
        Visibility::Public | Visibility::Internal | Visibility::ProtectedInternal => false,
        Visibility::Protected => {
            let index = modifiers
                .iter()
                .position(|m| m.is("protected"))
                .map(|i| i + 1)
                .unwrap_or(0);
            modifiers.insert(index, Token::ident("internal").with_leading(" "));
            true
        }
        Visibility::Private | Visibility::PrivateProtected => {
            if let Some(index) = modifiers.iter().position(|m| m.is("private")) {
                modifiers[index].text = "internal".to_string();
            }
            if let Some(index) = modifiers.iter().position(|m| m.is("protected")) {
                let removed = modifiers.remove(index);
                if index == 0 {
                    if let Some(first) = modifiers.first_mut() {
                        first.leading = removed.leading;
                    }
                }
            }
            true
        }
        Visibility::Implicit => {
            insert_modifier(modifiers, "internal", true, next_first, attributes_present);
            true
        }
    }
}
