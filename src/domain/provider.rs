//! Provider listing fields this core reads and mutates.
//!
//! Profile CRUD lives elsewhere; only visibility and promotion windows
//! are touched here.

use crate::domain::foundation::{ProviderId, Timestamp, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderListing {
    pub id: ProviderId,
    /// Account that owns the profile.
    pub user_id: UserId,
    pub display_name: String,
    /// Decrypted contact email, used for receipts and reminders.
    pub contact_email: Option<String>,
    pub is_visible: bool,
    pub featured_until: Option<Timestamp>,
    pub boosted_until: Option<Timestamp>,
}

/// End of a promotion window after buying `days` more.
///
/// Time still left on the current window is kept.
pub fn extend_promotion(current: Option<Timestamp>, days: u32, now: Timestamp) -> Timestamp {
    let anchor = current.map_or(now, |until| now.latest(until));
    anchor.add_days(i64::from(days))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extends_from_now_when_nothing_running() {
        let now = Timestamp::now();
        assert_eq!(extend_promotion(None, 7, now), now.add_days(7));
    }

    #[test]
    fn extends_from_current_end_when_still_running() {
        let now = Timestamp::now();
        assert_eq!(extend_promotion(Some(now.add_days(3)), 7, now), now.add_days(10));
    }

    #[test]
    fn lapsed_window_restarts_at_now() {
        let now = Timestamp::now();
        assert_eq!(extend_promotion(Some(now.minus_days(3)), 30, now), now.add_days(30));
    }
}
