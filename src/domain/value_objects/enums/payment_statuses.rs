use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Done,
    Failed,
    Cancelled,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            PaymentStatus::Done => "done",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", status)
    }
}

impl PaymentStatus {
    pub fn from_str(value: &str) -> Self {
        match value {
            "done" => PaymentStatus::Done,
            "cancelled" => PaymentStatus::Cancelled,
            _ => PaymentStatus::Failed,
        }
    }
}
