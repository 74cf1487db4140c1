//! Email configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Email configuration (Resend)
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Resend API key. Without one, emails are only logged.
    pub resend_api_key: Option<String>,

    #[serde(default = "default_from_email")]
    pub from_email: String,

    #[serde(default = "default_from_name")]
    pub from_name: String,
}

impl EmailConfig {
    /// Formatted "From" header value
    pub fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }

    pub fn validate(&self, environment: Environment) -> Result<(), ValidationError> {
        match self.resend_api_key.as_deref() {
            None | Some("") if environment == Environment::Production => {
                return Err(ValidationError::MissingRequired("EMAIL__RESEND_API_KEY"));
            }
            Some(key) if !key.is_empty() && !key.starts_with("re_") => {
                return Err(ValidationError::InvalidResendKey);
            }
            _ => {}
        }
        if !self.from_email.contains('@') {
            return Err(ValidationError::InvalidFromEmail);
        }
        Ok(())
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            resend_api_key: None,
            from_email: default_from_email(),
            from_name: default_from_name(),
        }
    }
}

fn default_from_email() -> String {
    "noreply@marketplace.local".to_string()
}

fn default_from_name() -> String {
    "Marketplace".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_header() {
        let config = EmailConfig {
            from_email: "billing@example.com".to_string(),
            from_name: "Billing".to_string(),
            ..Default::default()
        };
        assert_eq!(config.from_header(), "Billing <billing@example.com>");
    }

    #[test]
    fn test_key_optional_outside_production() {
        assert!(EmailConfig::default().validate(Environment::Development).is_ok());
        assert!(EmailConfig::default().validate(Environment::Production).is_err());
    }

    #[test]
    fn test_key_prefix_checked() {
        let config = EmailConfig {
            resend_api_key: Some("sk_wrong".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(Environment::Development),
            Err(ValidationError::InvalidResendKey)
        ));
    }

    #[test]
    fn test_invalid_from_email() {
        let config = EmailConfig {
            from_email: "not-an-email".to_string(),
            ..Default::default()
        };
        assert!(config.validate(Environment::Development).is_err());
    }
}
