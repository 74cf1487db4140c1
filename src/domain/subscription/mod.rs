//! Subscription domain - provider billing periods.

mod aggregate;
mod plan;
mod status;

pub use aggregate::{
    PublicSubscriptionStatus, Subscription, SubscriptionSummary, REMINDER_WINDOW_DAYS,
};
pub use plan::{SubscriptionPlan, TRIAL_DAYS};
pub use status::SubscriptionStatus;
