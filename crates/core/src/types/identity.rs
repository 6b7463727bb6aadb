//! Authentication principal as seen by the storefront.

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// The current authentication principal, or none.
///
/// The storefront never authenticates users itself; an external identity
/// provider decides who is signed in and the storefront reacts to changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "state", content = "userId", rename_all = "snake_case")]
pub enum Identity {
    #[default]
    Anonymous,
    Authenticated(UserId),
}

impl Identity {
    /// The signed-in user, if any.
    #[must_use]
    pub const fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(user_id) => Some(user_id),
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

impl From<Option<UserId>> for Identity {
    fn from(user_id: Option<UserId>) -> Self {
        user_id.map_or(Self::Anonymous, Self::Authenticated)
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => write!(f, "anonymous"),
            Self::Authenticated(user_id) => write!(f, "user:{user_id}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_option() {
        assert_eq!(Identity::from(None), Identity::Anonymous);
        let user = UserId::parse("u1").unwrap();
        let identity = Identity::from(Some(user.clone()));
        assert_eq!(identity.user_id(), Some(&user));
        assert!(identity.is_authenticated());
    }

    #[test]
    fn test_serde_shape() {
        let identity = Identity::Authenticated(UserId::parse("u1").unwrap());
        let json = serde_json::to_string(&identity).unwrap();
        assert_eq!(json, r#"{"state":"authenticated","userId":"u1"}"#);
        assert_eq!(
            serde_json::to_string(&Identity::Anonymous).unwrap(),
            r#"{"state":"anonymous"}"#
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Identity::Anonymous.to_string(), "anonymous");
        let identity = Identity::Authenticated(UserId::parse("u1").unwrap());
        assert_eq!(identity.to_string(), "user:u1");
    }
}
