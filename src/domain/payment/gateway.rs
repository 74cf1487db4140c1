//! Gateway-facing vocabulary shared by the adapters and the ledger.

use crate::domain::foundation::{Timestamp, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::PaymentStatus;

/// Which external gateway processed a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayKind {
    CinetPay,
    NotchPay,
}

impl GatewayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayKind::CinetPay => "cinetpay",
            GatewayKind::NotchPay => "notchpay",
        }
    }
}

impl fmt::Display for GatewayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GatewayKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cinetpay" => Ok(GatewayKind::CinetPay),
            "notchpay" => Ok(GatewayKind::NotchPay),
            other => Err(ValidationError::invalid_format(
                "gateway",
                format!("unknown gateway '{}'", other),
            )),
        }
    }
}

/// The five outcomes every gateway vocabulary is folded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NormalizedStatus {
    Accepted,
    Refused,
    WaitingCustomer,
    Cancelled,
    Expired,
}

impl From<NormalizedStatus> for PaymentStatus {
    fn from(status: NormalizedStatus) -> Self {
        match status {
            NormalizedStatus::Accepted => PaymentStatus::Accepted,
            NormalizedStatus::Refused => PaymentStatus::Refused,
            NormalizedStatus::WaitingCustomer => PaymentStatus::WaitingCustomer,
            NormalizedStatus::Cancelled => PaymentStatus::Cancelled,
            NormalizedStatus::Expired => PaymentStatus::Expired,
        }
    }
}

/// A gateway report as parsed from a webhook or status poll,
/// before its raw status has been normalized.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GatewayNotification {
    pub transaction_id: String,
    pub raw_status: Option<String>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub payment_method: Option<String>,
    pub operator_id: Option<String>,
    pub paid_at: Option<Timestamp>,
    pub fund_availability_date: Option<Timestamp>,
    pub error_message: Option<String>,
}

impl GatewayNotification {
    pub fn new(transaction_id: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            ..Default::default()
        }
    }

    /// Pairs the report with a recognized status.
    pub fn into_result(self, status: NormalizedStatus) -> GatewayResult {
        GatewayResult {
            status,
            amount: self.amount,
            payment_method: self.payment_method,
            operator_id: self.operator_id,
            paid_at: self.paid_at,
            fund_availability_date: self.fund_availability_date,
            error_message: self.error_message,
        }
    }
}

/// A gateway report whose status was recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResult {
    pub status: NormalizedStatus,
    pub amount: Option<i64>,
    pub payment_method: Option<String>,
    pub operator_id: Option<String>,
    pub paid_at: Option<Timestamp>,
    pub fund_availability_date: Option<Timestamp>,
    pub error_message: Option<String>,
}

impl GatewayResult {
    pub fn with_status(status: NormalizedStatus) -> Self {
        GatewayNotification::default().into_result(status)
    }

    pub fn accepted(amount: i64) -> Self {
        let mut result = Self::with_status(NormalizedStatus::Accepted);
        result.amount = Some(amount);
        result
    }

    pub fn refused(reason: impl Into<String>) -> Self {
        let mut result = Self::with_status(NormalizedStatus::Refused);
        result.error_message = Some(reason.into());
        result
    }
}
