//! Payment domain - lifecycle of one monetary transaction.

mod aggregate;
mod events;
mod gateway;
mod payment_type;
mod purpose;
mod status;

pub use aggregate::{
    generate_transaction_id, ApplyOutcome, IgnoreReason, NewPayment, Payment, TRANSACTION_PREFIX,
};
pub use events::{PaymentAccepted, PaymentEvent, PaymentRefused};
pub use gateway::{GatewayKind, GatewayNotification, GatewayResult, NormalizedStatus};
pub use payment_type::{validate_amount, PaymentType, AMOUNT_STEP, MAX_AMOUNT, MIN_AMOUNT};
pub use purpose::{PaymentPurpose, DEFAULT_BOOST_DAYS, DEFAULT_FEATURED_DAYS, MAX_PROMOTION_DAYS};
pub use status::PaymentStatus;
