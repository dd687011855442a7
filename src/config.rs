use dotenvy::dotenv;
use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// HS256 secret for bearer-token verification.
    pub jwt_secret: String,
    /// Hard cap on messages retained per conversation log.
    pub max_conversation_len: usize,
    /// Upper bound on `?limit=` for history reads.
    pub history_page_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| AppError::Config("JWT_SECRET missing".into()))?;
        if jwt_secret.len() < 32 {
            return Err(AppError::Config(
                "JWT_SECRET must be at least 32 bytes".into(),
            ));
        }
        let max_conversation_len = env::var("MAX_CONVERSATION_LEN")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10_000);
        let history_page_limit = env::var("HISTORY_PAGE_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(500);

        Ok(Self {
            port,
            jwt_secret,
            max_conversation_len,
            history_page_limit,
        })
    }

    pub fn test_defaults() -> Self {
        Self {
            port: 3000,
            jwt_secret: "test-secret-test-secret-test-secret!".into(),
            max_conversation_len: 10_000,
            history_page_limit: 500,
        }
    }
}
