use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::enums::user_statuses::UserSubscriptionStatus;

/// Monthly Pro price in KRW.
pub const SUBSCRIPTION_PRICE_KRW: i32 = 9900;
/// Billing period length.
pub const BILLING_PERIOD_DAYS: i64 = 30;
/// Analyses granted on each successful renewal charge.
pub const RENEWAL_TEST_COUNT: i32 = 10;
/// Analyses granted when a user row is first created.
pub const INITIAL_TEST_COUNT: i32 = 3;
/// Order name shown on the Toss receipt.
pub const ORDER_NAME: &str = "Vibe Fortune Pro 구독";

/// Deterministic order id for a billing attempt, derived from the
/// subscription and the period being paid for. Retrying the same period
/// produces the same id, so the gateway can deduplicate.
pub fn billing_order_id(subscription_id: Uuid, period: NaiveDate) -> String {
    format!(
        "ORDER_{}_{}",
        subscription_id.simple(),
        period.format("%Y%m%d")
    )
}

/// Subscription page payload: users row fields plus card/renewal details for
/// users that still hold a non-terminated subscription.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInfoDto {
    pub user_email: String,
    pub status: UserSubscriptionStatus,
    pub test_count: i32,
    pub next_billing_date: Option<NaiveDate>,
    pub card_number: Option<String>,
    pub card_company: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepRowResult {
    pub subscription_id: Uuid,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepSummary {
    pub processed: usize,
    pub results: Vec<SweepRowResult>,
    pub terminated: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_is_deterministic_per_subscription_and_period() {
        let subscription_id = Uuid::parse_str("7f2c9b55-4a7e-4f0e-9b1a-1c2d3e4f5a6b").unwrap();
        let period = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();

        let first = billing_order_id(subscription_id, period);
        let second = billing_order_id(subscription_id, period);
        assert_eq!(first, second);
        assert_eq!(
            first,
            "ORDER_7f2c9b554a7e4f0e9b1a1c2d3e4f5a6b_20250101"
        );

        let next_period = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        assert_ne!(first, billing_order_id(subscription_id, next_period));
    }
}
