//! Who is asking to read a contact.

use crate::domain::foundation::{ProviderId, UserId, ValidationError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewerRole {
    Client,
    Provider,
    Admin,
}

impl FromStr for ViewerRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "client" => Ok(ViewerRole::Client),
            "provider" => Ok(ViewerRole::Provider),
            "admin" => Ok(ViewerRole::Admin),
            other => Err(ValidationError::invalid_format(
                "role",
                format!("unknown role '{}'", other),
            )),
        }
    }
}

/// Caller identity as seen by the contact gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: Option<UserId>,
    pub role: ViewerRole,
    /// Provider profile owned by the caller, if any.
    pub provider_id: Option<ProviderId>,
}

impl Viewer {
    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            role: ViewerRole::Admin,
            provider_id: None,
        }
    }

    pub fn provider(user_id: UserId, provider_id: ProviderId) -> Self {
        Self {
            user_id: Some(user_id),
            role: ViewerRole::Provider,
            provider_id: Some(provider_id),
        }
    }

    pub fn client(user_id: Option<UserId>) -> Self {
        Self {
            user_id,
            role: ViewerRole::Client,
            provider_id: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ViewerRole::Admin
    }

    pub fn owns(&self, provider_id: ProviderId) -> bool {
        self.provider_id == Some(provider_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_owns_only_their_profile() {
        let provider_id = ProviderId::new();
        let viewer = Viewer::provider(UserId::new(), provider_id);

        assert!(viewer.owns(provider_id));
        assert!(!viewer.owns(ProviderId::new()));
        assert!(!viewer.is_admin());
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("ADMIN".parse::<ViewerRole>().unwrap(), ViewerRole::Admin);
        assert!("guest".parse::<ViewerRole>().is_err());
    }
}
