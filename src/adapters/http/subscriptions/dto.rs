//! HTTP DTOs for subscription endpoints.

use serde::Deserialize;

use crate::domain::payment::GatewayKind;
use crate::domain::subscription::SubscriptionPlan;

use super::super::payments::PayerDetails;

/// `POST /subscriptions/subscribe`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub plan: SubscriptionPlan,
    #[serde(default)]
    pub gateway: Option<GatewayKind>,
    #[serde(flatten)]
    pub payer: PayerDetails,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_plan_and_gateway() {
        let request: SubscribeRequest =
            serde_json::from_value(json!({ "plan": "quarterly", "gateway": "notchpay" })).unwrap();

        assert_eq!(request.plan, SubscriptionPlan::Quarterly);
        assert_eq!(request.gateway, Some(GatewayKind::NotchPay));
    }

    #[test]
    fn unknown_plan_is_rejected() {
        let result: Result<SubscribeRequest, _> =
            serde_json::from_value(json!({ "plan": "weekly" }));
        assert!(result.is_err());
    }
}
