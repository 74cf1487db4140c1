//! HTTP adapter for payment endpoints.
//!
//! - `POST /payments/initialize` - Start a featured/boost/subscription/premium payment
//! - `GET /payments/:transactionId/status` - Current status
//! - `POST /payments/webhook` - CinetPay notification
//! - `POST /payments/notchpay/webhook` - NotchPay notification

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::{InitiatedPaymentResponse, PayerDetails, PaymentStatusResponse};
pub use routes::payment_routes;
