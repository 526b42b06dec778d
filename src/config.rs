use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub registration: RegistrationMode,
    pub max_body_size: usize,
    pub log_level: String,
    pub google: GoogleConfig,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub userinfo_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationMode {
    Open,
    Closed,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;

        let host: IpAddr = env_or("AUTOVM_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid AUTOVM_HOST: {e}"))?;

        let port: u16 = env_or("AUTOVM_PORT", "8000")
            .parse()
            .map_err(|e| format!("Invalid AUTOVM_PORT: {e}"))?;

        let registration = match env_or("AUTOVM_REGISTRATION", "open").as_str() {
            "closed" => RegistrationMode::Closed,
            _ => RegistrationMode::Open,
        };

        let max_body_size: usize = env_or("AUTOVM_MAX_BODY_SIZE", "1048576")
            .parse()
            .map_err(|e| format!("Invalid AUTOVM_MAX_BODY_SIZE: {e}"))?;

        let log_level = env_or("AUTOVM_LOG_LEVEL", "info");

        let google = GoogleConfig {
            userinfo_url: env_or(
                "AUTOVM_GOOGLE_USERINFO_URL",
                "https://www.googleapis.com/oauth2/v2/userinfo",
            ),
            timeout_secs: env_or("AUTOVM_GOOGLE_TIMEOUT_SECS", "300")
                .parse()
                .map_err(|e| format!("Invalid AUTOVM_GOOGLE_TIMEOUT_SECS: {e}"))?,
        };

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            registration,
            max_body_size,
            log_level,
            google,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
