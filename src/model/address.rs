//! Email addresses as returned to clients.

use serde::{Deserialize, Serialize};

/// A display name plus a bare address.
///
/// Either half may be empty: `"user@example.com"` has no name, and a
/// malformed `From:` may yield a name without an address.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub name: String,
    /// The bare email address (`user@domain`).
    pub email: String,
}

impl EmailAddress {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// `true` when both name and address are empty.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.email.is_empty()
    }
}

impl From<&mail_parser::Addr<'_>> for EmailAddress {
    fn from(addr: &mail_parser::Addr<'_>) -> Self {
        Self {
            name: addr.name().unwrap_or_default().trim().to_string(),
            email: addr.address().unwrap_or_default().trim().to_string(),
        }
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.email)
        } else {
            write!(f, "{} <{}>", self.name, self.email)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_name() {
        let addr = EmailAddress::new("Alice", "alice@example.com");
        assert_eq!(addr.to_string(), "Alice <alice@example.com>");
    }

    #[test]
    fn test_display_without_name() {
        let addr = EmailAddress::new("", "alice@example.com");
        assert_eq!(addr.to_string(), "alice@example.com");
    }

    #[test]
    fn test_is_empty() {
        assert!(EmailAddress::default().is_empty());
        assert!(!EmailAddress::new("", "a@b.c").is_empty());
    }
}
