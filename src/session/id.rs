//! Session and message identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SessionError};

/// Separator between folder id and ordinal in a message id.
pub const MESSAGE_ID_DELIMITER: &str = "::";

/// Opaque, process-unique session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| SessionError::InvalidSession(s.to_string()))
    }
}

/// Build the id of message `ordinal` as listed in `folder_id`.
pub fn message_id(folder_id: &str, ordinal: usize) -> String {
    format!("{folder_id}{MESSAGE_ID_DELIMITER}{ordinal}")
}

/// Split a message id into `(folder_id, ordinal)`.
///
/// The ordinal follows the last delimiter and must be a plain decimal
/// number; anything else is a not-found error, never ordinal 0.
pub fn parse_message_id(id: &str) -> Result<(&str, usize)> {
    let not_found = || SessionError::MessageNotFound(id.to_string());

    let (folder_id, ordinal) = id.rsplit_once(MESSAGE_ID_DELIMITER).ok_or_else(not_found)?;
    if folder_id.is_empty() || ordinal.is_empty() || !ordinal.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(not_found());
    }
    let ordinal = ordinal.parse::<usize>().map_err(|_| not_found())?;
    Ok((folder_id, ordinal))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_roundtrip() {
        let id = message_id("Work/Projects", 42);
        assert_eq!(id, "Work/Projects::42");
        assert_eq!(parse_message_id(&id).unwrap(), ("Work/Projects", 42));
    }

    #[test]
    fn test_delimiter_inside_folder_id() {
        assert_eq!(parse_message_id("a::b::7").unwrap(), ("a::b", 7));
    }

    #[test]
    fn test_malformed_ids_are_not_found() {
        for bad in ["Inbox::abc", "Inbox::", "Inbox", "::3", "Inbox::+3", "Inbox::-1", "Inbox:: 3"] {
            let err = parse_message_id(bad).unwrap_err();
            assert!(
                matches!(err, SessionError::MessageNotFound(_)),
                "{bad} should be not found"
            );
        }
    }

    #[test]
    fn test_ordinal_overflow_is_not_found() {
        assert!(parse_message_id("Inbox::99999999999999999999999999").is_err());
    }

    #[test]
    fn test_session_id_parse() {
        let id = SessionId::new();
        assert_eq!(id.to_string().parse::<SessionId>().unwrap(), id);
        assert!(matches!(
            "nope".parse::<SessionId>(),
            Err(SessionError::InvalidSession(_))
        ));
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }
}
