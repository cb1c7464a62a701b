use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const EVENT_USER_CREATED: &str = "user.created";
pub const EVENT_USER_UPDATED: &str = "user.updated";

#[derive(Debug, Deserialize)]
pub struct ClerkEvent {
    #[serde(rename = "type")]
    pub type_: String,
    pub data: ClerkUserData,
}

#[derive(Debug, Deserialize)]
pub struct ClerkUserData {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<ClerkEmailAddress>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClerkEmailAddress {
    pub email_address: String,
}

impl ClerkUserData {
    pub fn primary_email(&self) -> Option<&str> {
        self.email_addresses
            .first()
            .map(|address| address.email_address.as_str())
    }

    /// Korean name order (family name first), falling back to the email
    /// local part and then a fixed placeholder, as the webhook handler of
    /// the web app does.
    pub fn display_name(&self) -> String {
        let joined: String = [self.last_name.as_deref(), self.first_name.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if !joined.is_empty() {
            return joined;
        }
        self.primary_email()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
            .map(|local| local.to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

/// Verifies a svix webhook signature and parses the Clerk event.
/// https://docs.svix.com/receiving/verifying-payloads/how-manual
pub fn verify_webhook_signature(
    secret: &str,
    message_id: &str,
    timestamp: &str,
    signature_header: &str,
    payload: &[u8],
) -> Result<ClerkEvent> {
    let secret = secret.strip_prefix("whsec_").unwrap_or(secret);
    let key = BASE64.decode(secret)?;

    let mut mac = HmacSha256::new_from_slice(&key)?;
    mac.update(message_id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = BASE64.encode(mac.finalize().into_bytes());

    // The header may carry several space-delimited "v1,<base64>" entries.
    let verified = signature_header
        .split_whitespace()
        .filter_map(|entry| entry.strip_prefix("v1,"))
        .any(|signature| signature == expected);

    if !verified {
        anyhow::bail!("invalid webhook signature");
    }

    let event: ClerkEvent = serde_json::from_slice(payload)?;
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_dGVzdC1zaWduaW5nLXNlY3JldC0xMjM0NTY=";

    fn sign(message_id: &str, timestamp: &str, payload: &[u8]) -> String {
        let key = BASE64
            .decode(SECRET.strip_prefix("whsec_").unwrap())
            .unwrap();
        let mut mac = HmacSha256::new_from_slice(&key).unwrap();
        mac.update(format!("{message_id}.{timestamp}.").as_bytes());
        mac.update(payload);
        format!("v1,{}", BASE64.encode(mac.finalize().into_bytes()))
    }

    fn user_created_payload() -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "type": "user.created",
            "data": {
                "id": "user_2abc",
                "email_addresses": [{ "email_address": "hong@example.com" }],
                "first_name": "길동",
                "last_name": "홍",
            }
        }))
        .unwrap()
    }

    #[test]
    fn accepts_valid_signature() {
        let payload = user_created_payload();
        let signature = sign("msg_1", "1712000000", &payload);

        let event =
            verify_webhook_signature(SECRET, "msg_1", "1712000000", &signature, &payload)
                .expect("valid signature should verify");
        assert_eq!(event.type_, EVENT_USER_CREATED);
        assert_eq!(event.data.id, "user_2abc");
        assert_eq!(event.data.display_name(), "홍길동");
    }

    #[test]
    fn accepts_signature_among_multiple_entries() {
        let payload = user_created_payload();
        let signature = format!("v1,bm90LXRoZS1yaWdodC1zaWc= {}", sign("msg_1", "1", &payload));

        assert!(verify_webhook_signature(SECRET, "msg_1", "1", &signature, &payload).is_ok());
    }

    #[test]
    fn rejects_tampered_payload() {
        let payload = user_created_payload();
        let signature = sign("msg_1", "1712000000", &payload);

        let mut tampered = payload.clone();
        tampered[0] ^= 1;
        assert!(
            verify_webhook_signature(SECRET, "msg_1", "1712000000", &signature, &tampered)
                .is_err()
        );
    }

    #[test]
    fn rejects_wrong_message_id() {
        let payload = user_created_payload();
        let signature = sign("msg_1", "1712000000", &payload);

        assert!(
            verify_webhook_signature(SECRET, "msg_2", "1712000000", &signature, &payload)
                .is_err()
        );
    }

    #[test]
    fn display_name_falls_back_to_email_local_part() {
        let data = ClerkUserData {
            id: "user_1".to_string(),
            email_addresses: vec![ClerkEmailAddress {
                email_address: "fortune@example.com".to_string(),
            }],
            first_name: None,
            last_name: None,
        };
        assert_eq!(data.display_name(), "fortune");

        let nameless = ClerkUserData {
            id: "user_2".to_string(),
            email_addresses: vec![],
            first_name: None,
            last_name: None,
        };
        assert_eq!(nameless.display_name(), "Unknown");
    }
}
