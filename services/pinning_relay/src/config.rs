//! Relay configuration, read from the process environment

pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_PINATA_API_URL: &str = "https://api.pinata.cloud";

/// Credential used against the Pinata API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinataCredentials {
    Jwt(String),
    ApiKey { key: String, secret: String },
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub port: u16,
    pub pinata_api_url: String,
    pub jwt: Option<String>,
    pub api_key: Option<String>,
    pub secret_api_key: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            pinata_api_url: DEFAULT_PINATA_API_URL.to_string(),
            jwt: None,
            api_key: None,
            secret_api_key: None,
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            port: var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            pinata_api_url: var("PINATA_API_URL")
                .unwrap_or_else(|| DEFAULT_PINATA_API_URL.to_string()),
            jwt: var("PINATA_JWT"),
            api_key: var("PINATA_API_KEY"),
            secret_api_key: var("PINATA_SECRET_API_KEY"),
        }
    }

    /// JWT wins over the key pair; a key without its secret is unusable
    pub fn credentials(&self) -> Option<PinataCredentials> {
        if let Some(jwt) = &self.jwt {
            return Some(PinataCredentials::Jwt(jwt.clone()));
        }
        match (&self.api_key, &self.secret_api_key) {
            (Some(key), Some(secret)) => Some(PinataCredentials::ApiKey {
                key: key.clone(),
                secret: secret.clone(),
            }),
            _ => None,
        }
    }
}
