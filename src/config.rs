use std::env;
use std::fmt::Display;
use std::str::FromStr;

const DEFAULT_JWT_SECRET: &str = "dev-secret-change-me";

/// TTLs aceitos em horas (até um ano)
const MAX_TTL_HOURS: i64 = 8760;

/// Configuração do serviço, carregada do ambiente (.env + variáveis do processo)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub token_ttl_hours: i64,
    pub teacher_code_ttl_hours: i64,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenv::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set".to_string())?;

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            log::warn!("⚠️  JWT_SECRET not set, using development secret");
            DEFAULT_JWT_SECRET.to_string()
        });

        Ok(Self {
            host: var_or("HOST", "0.0.0.0"),
            port: parse_or("PORT", 3001)?,
            database_url,
            jwt_secret,
            jwt_issuer: var_or("JWT_ISSUER", "aprender-em-movimento"),
            jwt_audience: var_or("JWT_AUDIENCE", "aprender-api"),
            token_ttl_hours: check_ttl("TOKEN_TTL_HOURS", parse_or("TOKEN_TTL_HOURS", 24)?)?,
            teacher_code_ttl_hours: check_ttl(
                "TEACHER_CODE_TTL_HOURS",
                parse_or("TEACHER_CODE_TTL_HOURS", 24)?,
            )?,
            cors_origins: parse_origins(&var_or(
                "CORS_ORIGINS",
                "http://localhost:3000,http://localhost:5173",
            )),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("Invalid {} value '{}': {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

fn check_ttl(key: &str, hours: i64) -> Result<i64, String> {
    if (1..=MAX_TTL_HOURS).contains(&hours) {
        Ok(hours)
    } else {
        Err(format!("{} must be between 1 and {} hours, got {}", key, MAX_TTL_HOURS, hours))
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

#[cfg(test)]
impl Config {
    /// Configuração fixa para testes (não lê o ambiente)
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: "mongodb://localhost:27017/aprender_test".to_string(),
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "aprender-em-movimento".to_string(),
            jwt_audience: "aprender-api".to_string(),
            token_ttl_hours: 1,
            teacher_code_ttl_hours: 24,
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins() {
        let origins = parse_origins(" http://localhost:3000/, ,https://app.example.com ");
        assert_eq!(origins, vec!["http://localhost:3000", "https://app.example.com"]);
    }

    #[test]
    fn test_parse_or_default_when_missing() {
        let value: i64 = parse_or("APRENDER_TEST_SURELY_UNSET_VAR", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_ttl_range() {
        assert_eq!(check_ttl("TOKEN_TTL_HOURS", 1), Ok(1));
        assert_eq!(check_ttl("TOKEN_TTL_HOURS", MAX_TTL_HOURS), Ok(MAX_TTL_HOURS));
        assert!(check_ttl("TOKEN_TTL_HOURS", 0).is_err());
        assert!(check_ttl("TOKEN_TTL_HOURS", -5).is_err());
        assert!(check_ttl("TEACHER_CODE_TTL_HOURS", i64::MAX).is_err());
    }

    #[test]
    fn test_bind_address() {
        let mut config = Config::for_tests();
        config.port = 8080;
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }
}
