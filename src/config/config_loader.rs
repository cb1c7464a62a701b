use anyhow::{Ok, Result};
use tracing::warn;

use super::config_model::DotEnvyConfig;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = super::config_model::Server {
        port: std::env::var("SERVER_PORT")
            .expect("SERVER_PORT is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .expect("SERVER_BODY_LIMIT is invalid")
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .expect("SERVER_TIMEOUT is invalid")
            .parse()?,
    };

    let database = super::config_model::Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let clerk = super::config_model::Clerk {
        jwt_secret: std::env::var("CLERK_JWT_SECRET").expect("CLERK_JWT_SECRET is invalid"),
        webhook_secret: optional("CLERK_WEBHOOK_SECRET"),
    };

    let toss = super::config_model::Toss {
        secret_key: required_for_runtime("TOSS_SECRET_KEY"),
    };

    let gemini = super::config_model::Gemini {
        api_key: required_for_runtime("GEMINI_API_KEY"),
    };

    let billing = super::config_model::Billing {
        cron_secret: optional("CRON_SECRET"),
    };

    Ok(DotEnvyConfig {
        server,
        database,
        clerk,
        toss,
        gemini,
        billing,
    })
}

fn optional(key: &str) -> Option<String> {
    match std::env::var(key) {
        std::result::Result::Ok(value) if !value.trim().is_empty() => Some(value),
        _ => {
            warn!("{key} is not set; the feature depending on it is disabled");
            None
        }
    }
}

// Provider keys are only exercised when the matching endpoint is hit, so a
// missing one degrades that endpoint instead of failing startup.
fn required_for_runtime(key: &str) -> String {
    match std::env::var(key) {
        std::result::Result::Ok(value) if !value.trim().is_empty() => value,
        _ => {
            warn!("{key} is not set; requests against this provider will fail");
            String::new()
        }
    }
}
