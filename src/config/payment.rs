//! Payment configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::payment::{validate_amount, GatewayKind};

/// Payment configuration (gateways, prices, expiry)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// ISO currency of every payment
    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_gateway")]
    pub default_gateway: GatewayKind,

    /// Outbound gateway call timeout in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_unlock_price")]
    pub contact_unlock_price: i64,

    /// PENDING/WAITING_CUSTOMER payments older than this are expired
    #[serde(default = "default_pending_expiry")]
    pub pending_expiry_minutes: i64,

    /// Route every gateway through the scripted mock (non-production only)
    #[serde(default)]
    pub use_mock_gateway: bool,

    pub cinetpay: Option<CinetPaySettings>,

    pub notchpay: Option<NotchPaySettings>,
}

/// CinetPay credentials and callback URLs
#[derive(Debug, Clone, Deserialize)]
pub struct CinetPaySettings {
    pub api_key: String,
    pub site_id: String,
    /// HMAC key for the `x-token` webhook header
    pub secret_key: String,
    pub base_url: Option<String>,
    #[serde(default)]
    pub notify_url: String,
    #[serde(default)]
    pub return_url: String,
}

/// NotchPay credentials
#[derive(Debug, Clone, Deserialize)]
pub struct NotchPaySettings {
    pub public_key: String,
    /// HMAC key for the `x-notch-signature` webhook header
    pub hash_key: String,
    pub base_url: Option<String>,
    pub callback_url: Option<String>,
}

impl PaymentConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn has_gateway(&self, kind: GatewayKind) -> bool {
        match kind {
            GatewayKind::CinetPay => self.cinetpay.is_some(),
            GatewayKind::NotchPay => self.notchpay.is_some(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidCurrency);
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout);
        }
        if validate_amount(self.contact_unlock_price).is_err() {
            return Err(ValidationError::InvalidUnlockPrice);
        }
        if self.pending_expiry_minutes <= 0 {
            return Err(ValidationError::InvalidPendingExpiry);
        }
        if let Some(cinetpay) = &self.cinetpay {
            if cinetpay.api_key.is_empty() {
                return Err(ValidationError::MissingRequired("PAYMENT__CINETPAY__API_KEY"));
            }
            if cinetpay.site_id.is_empty() {
                return Err(ValidationError::MissingRequired("PAYMENT__CINETPAY__SITE_ID"));
            }
            if cinetpay.secret_key.is_empty() {
                return Err(ValidationError::MissingRequired("PAYMENT__CINETPAY__SECRET_KEY"));
            }
        }
        if let Some(notchpay) = &self.notchpay {
            if notchpay.public_key.is_empty() {
                return Err(ValidationError::MissingRequired("PAYMENT__NOTCHPAY__PUBLIC_KEY"));
            }
            if notchpay.hash_key.is_empty() {
                return Err(ValidationError::MissingRequired("PAYMENT__NOTCHPAY__HASH_KEY"));
            }
        }
        if !self.use_mock_gateway && !self.has_gateway(self.default_gateway) {
            return Err(ValidationError::DefaultGatewayNotConfigured(
                self.default_gateway.as_str(),
            ));
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            default_gateway: default_gateway(),
            request_timeout_secs: default_timeout(),
            contact_unlock_price: default_unlock_price(),
            pending_expiry_minutes: default_pending_expiry(),
            use_mock_gateway: false,
            cinetpay: None,
            notchpay: None,
        }
    }
}

fn default_currency() -> String {
    "XAF".to_string()
}

fn default_gateway() -> GatewayKind {
    GatewayKind::CinetPay
}

fn default_timeout() -> u64 {
    30
}

fn default_unlock_price() -> i64 {
    1000
}

fn default_pending_expiry() -> i64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cinetpay() -> CinetPaySettings {
        CinetPaySettings {
            api_key: "key".to_string(),
            site_id: "123456".to_string(),
            secret_key: "secret".to_string(),
            base_url: None,
            notify_url: "https://api.example.com/payments/webhook".to_string(),
            return_url: "https://app.example.com/payments/done".to_string(),
        }
    }

    #[test]
    fn test_defaults() {
        let config = PaymentConfig::default();
        assert_eq!(config.currency, "XAF");
        assert_eq!(config.default_gateway, GatewayKind::CinetPay);
        assert_eq!(config.contact_unlock_price, 1000);
    }

    #[test]
    fn test_default_gateway_must_be_configured() {
        let config = PaymentConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::DefaultGatewayNotConfigured("cinetpay"))
        ));

        let config = PaymentConfig {
            cinetpay: Some(cinetpay()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_mock_gateway_needs_no_credentials() {
        let config = PaymentConfig {
            use_mock_gateway: true,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unlock_price_follows_amount_rules() {
        let config = PaymentConfig {
            contact_unlock_price: 42,
            use_mock_gateway: true,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidUnlockPrice)));
    }

    #[test]
    fn test_currency_must_be_iso_code() {
        let config = PaymentConfig {
            currency: "xaf".to_string(),
            use_mock_gateway: true,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidCurrency)));
    }

    #[test]
    fn test_empty_notchpay_key_is_rejected() {
        let config = PaymentConfig {
            use_mock_gateway: true,
            notchpay: Some(NotchPaySettings {
                public_key: String::new(),
                hash_key: "hash".to_string(),
                base_url: None,
                callback_url: None,
            }),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::MissingRequired(_))));
    }
}
