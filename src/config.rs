use anyhow::Context;

pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 86_400;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub token_ttl_seconds: i64,
    pub bind_addr: String,
    pub seed_demo_data: bool,
}

impl Config {
    /// Reads `FLOCK_*` variables. Only the signing secret is mandatory.
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = std::env::var("FLOCK_JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .context("FLOCK_JWT_SECRET must be set")?;

        Ok(Config {
            jwt_secret,
            token_ttl_seconds: token_ttl_seconds(),
            bind_addr: std::env::var("FLOCK_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            seed_demo_data: std::env::var("FLOCK_SEED_DEMO")
                .map(|v| v == "true")
                .unwrap_or(false),
        })
    }

    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Config {
            jwt_secret: jwt_secret.into(),
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            seed_demo_data: false,
        }
    }
}

fn token_ttl_seconds() -> i64 {
    std::env::var("FLOCK_TOKEN_TTL_SECONDS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_TOKEN_TTL_SECONDS)
}
