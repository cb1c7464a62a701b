use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Entitlement status carried on the users row. `Cancelled` keeps pro-tier
/// benefits until the renewal date passes.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum UserSubscriptionStatus {
    #[default]
    Free,
    Pro,
    Cancelled,
    PaymentFailed,
}

impl Display for UserSubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            UserSubscriptionStatus::Free => "free",
            UserSubscriptionStatus::Pro => "pro",
            UserSubscriptionStatus::Cancelled => "cancelled",
            UserSubscriptionStatus::PaymentFailed => "payment_failed",
        };
        write!(f, "{}", status)
    }
}

impl UserSubscriptionStatus {
    pub fn from_str(value: &str) -> Self {
        match value {
            "pro" => UserSubscriptionStatus::Pro,
            "cancelled" => UserSubscriptionStatus::Cancelled,
            "payment_failed" => UserSubscriptionStatus::PaymentFailed,
            _ => UserSubscriptionStatus::Free,
        }
    }

    /// Pro-tier generation is kept through a pending cancellation.
    pub fn has_pro_benefits(&self) -> bool {
        matches!(
            self,
            UserSubscriptionStatus::Pro | UserSubscriptionStatus::Cancelled
        )
    }
}
