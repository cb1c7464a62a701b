#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub server: Server,
    pub database: Database,
    pub clerk: Clerk,
    pub toss: Toss,
    pub gemini: Gemini,
    pub billing: Billing,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Clerk {
    pub jwt_secret: String,
    /// Svix signing secret. Webhook delivery is disabled when unset.
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Toss {
    pub secret_key: String,
}

#[derive(Debug, Clone)]
pub struct Gemini {
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct Billing {
    /// Shared secret for the cron endpoint. The sweep is unreachable when unset.
    pub cron_secret: Option<String>,
}
