use crate::core::codec::DEFAULT_MAX_ATTACHMENT_BYTES;
use crate::error::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_UPLOAD_PATH: &str = "./uploads";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub upload_path: String,
    /// Prefix of attachment references, e.g. `https://survey.example.com`.
    pub public_base_url: String,
    pub max_attachment_bytes: usize,
    pub db_max_connections: u32,
}

impl Config {
    /// Reads the process environment after `.env` has been loaded.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).filter(|v| !v.is_empty()).ok_or_else(|| Error::ServerError(format!("environment variable {} not been set", key)));
        let or = |key: &str, default: &str| lookup(key).filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_owned());
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            bind_addr: or("BIND_ADDR", DEFAULT_BIND_ADDR),
            jwt_secret: required("JWT_SECRET")?,
            upload_path: or("UPLOAD_PATH", DEFAULT_UPLOAD_PATH),
            public_base_url: or("PUBLIC_BASE_URL", ""),
            max_attachment_bytes: match lookup("MAX_ATTACHMENT_BYTES") {
                Some(v) => v.trim().parse()?,
                None => DEFAULT_MAX_ATTACHMENT_BYTES,
            },
            db_max_connections: match lookup("DB_MAX_CONNECTIONS") {
                Some(v) => v.trim().parse()?,
                None => DEFAULT_DB_MAX_CONNECTIONS,
            },
        })
    }

    pub fn uploads_base(&self) -> String {
        format!("{}/uploads", self.public_base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/survey"), ("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.upload_path, DEFAULT_UPLOAD_PATH);
        assert_eq!(config.max_attachment_bytes, DEFAULT_MAX_ATTACHMENT_BYTES);
        assert_eq!(config.db_max_connections, DEFAULT_DB_MAX_CONNECTIONS);
        assert_eq!(config.uploads_base(), "/uploads");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/survey"),
            ("JWT_SECRET", "s3cret"),
            ("PUBLIC_BASE_URL", "https://survey.example.com/"),
            ("MAX_ATTACHMENT_BYTES", "1024"),
            ("DB_MAX_CONNECTIONS", "20"),
        ]))
        .unwrap();
        assert_eq!(config.uploads_base(), "https://survey.example.com/uploads");
        assert_eq!(config.max_attachment_bytes, 1024);
        assert_eq!(config.db_max_connections, 20);
    }

    #[test]
    fn test_missing_or_bad_values() {
        assert!(matches!(Config::from_lookup(lookup(&[("JWT_SECRET", "s")])), Err(Error::ServerError(_))));
        assert!(matches!(
            Config::from_lookup(lookup(&[("DATABASE_URL", "x"), ("JWT_SECRET", "s"), ("MAX_ATTACHMENT_BYTES", "ten")])),
            Err(Error::ParseIntError(_))
        ));
    }
}
