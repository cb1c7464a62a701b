use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

const TOSS_API_BASE_URL: &str = "https://api.tosspayments.com/v1";

/// Toss error code for limit-exceeded / insufficient-funds declines.
pub const DECLINE_CODE: &str = "REJECT_CARD_PAYMENT";

/// Typed gateway error preserving the provider's error code and HTTP status,
/// so handlers can mirror them to the caller.
#[derive(Debug, Clone, Error)]
#[error("{message} (code={code}, status={status})")]
pub struct TossApiError {
    pub code: String,
    pub message: String,
    pub status: u16,
}

impl TossApiError {
    pub fn is_card_declined(&self) -> bool {
        self.code == DECLINE_CODE
    }
}

#[derive(Debug, Deserialize)]
struct TossErrorEnvelope {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TossCard {
    /// Masked card number; only the last 4 digits are persisted.
    pub number: String,
    pub card_type: Option<String>,
    pub issuer_code: Option<String>,
    pub issuer_name: Option<String>,
    pub owner_type: Option<String>,
}

impl TossCard {
    pub fn last4(&self) -> Option<String> {
        let digits: String = self.number.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() >= 4 {
            Some(digits[digits.len() - 4..].to_string())
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedBillingKey {
    pub billing_key: String,
    pub customer_key: String,
    pub card: Option<TossCard>,
    pub authenticated_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingCharge {
    pub payment_key: String,
    pub order_id: String,
    pub total_amount: i64,
    pub status: String,
    pub approved_at: Option<String>,
}

/// Minimal Toss Payments billing client built on reqwest.
/// https://docs.tosspayments.com/guides/v2/billing
pub struct TossClient {
    http: reqwest::Client,
    secret_key: String,
}

impl TossClient {
    pub fn new(secret_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
        }
    }

    // Toss uses Basic auth with "<secret key>:" base64-encoded.
    fn authorization_header(&self) -> String {
        format!("Basic {}", BASE64.encode(format!("{}:", self.secret_key)))
    }

    async fn ensure_success(
        resp: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response, TossApiError> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let (code, message) = match serde_json::from_str::<TossErrorEnvelope>(&body) {
            Ok(envelope) => (envelope.code, envelope.message),
            Err(_) => (None, None),
        };

        error!(
            status = %status,
            toss_error_code = ?code,
            toss_error_message = ?message,
            response_body = %body,
            context = %context,
            "toss api request failed"
        );

        Err(TossApiError {
            code: code.unwrap_or_else(|| "UNKNOWN_ERROR".to_string()),
            message: message.unwrap_or_else(|| format!("Toss API request failed: {context}")),
            status: status.as_u16(),
        })
    }

    /// Exchanges a card-registration authKey for a billing key.
    /// The authKey is single-use; it arrives on the registration success URL.
    pub async fn issue_billing_key(
        &self,
        auth_key: &str,
        customer_key: &str,
    ) -> Result<IssuedBillingKey> {
        let resp = self
            .http
            .post(format!("{TOSS_API_BASE_URL}/billing/authorizations/issue"))
            .header(AUTHORIZATION, self.authorization_header())
            .header(CONTENT_TYPE, "application/json")
            .json(&json!({
                "authKey": auth_key,
                "customerKey": customer_key,
            }))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "issue billing key").await?;

        let issued: IssuedBillingKey = resp.json().await?;
        Ok(issued)
    }

    /// Approves a recurring charge against a billing key.
    pub async fn charge_billing_key(
        &self,
        billing_key: &str,
        customer_key: &str,
        amount: i32,
        order_id: &str,
        order_name: &str,
    ) -> Result<BillingCharge> {
        let resp = self
            .http
            .post(format!("{TOSS_API_BASE_URL}/billing/{billing_key}"))
            .header(AUTHORIZATION, self.authorization_header())
            .header(CONTENT_TYPE, "application/json")
            .json(&json!({
                "customerKey": customer_key,
                "amount": amount,
                "orderId": order_id,
                "orderName": order_name,
            }))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "charge billing key").await?;

        let charge: BillingCharge = resp.json().await?;
        Ok(charge)
    }

    /// Revokes a billing key so no further automatic charges can be made.
    pub async fn delete_billing_key(&self, billing_key: &str, customer_key: &str) -> Result<()> {
        let resp = self
            .http
            .delete(format!(
                "{TOSS_API_BASE_URL}/billing/authorizations/{billing_key}"
            ))
            .header(AUTHORIZATION, self.authorization_header())
            .header(CONTENT_TYPE, "application/json")
            .json(&json!({ "customerKey": customer_key }))
            .send()
            .await?;
        Self::ensure_success(resp, "delete billing key").await?;

        Ok(())
    }
}
