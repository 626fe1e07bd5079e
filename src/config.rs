use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub session_ttl_days: i64,
    pub password_min_len: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let session_ttl_days = env::var("SESSION_TTL_DAYS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(7);
        let password_min_len = env::var("PASSWORD_MIN_LEN")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(6);

        Ok(Self {
            database_url,
            bind_addr,
            session_ttl_days,
            password_min_len,
        })
    }
}
