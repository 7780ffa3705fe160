pub mod headers;
pub mod ip_whitelist;
pub mod rate_limit;

pub use headers::security_headers_middleware;
pub use ip_whitelist::{ip_whitelist_middleware, IpWhitelist};
pub use rate_limit::{rate_limit_middleware, RateLimitStatistics, RateLimiter};

use serde::{Deserialize, Serialize};
use std::fmt;

/// API-key auth, admin whitelist, and CORS settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Require an API key on the monitoring endpoint
    pub require_auth: bool,

    /// Accepted API keys for the monitoring endpoint
    pub api_keys: Vec<String>,

    /// IPs allowed through to admin-prefixed routes
    pub admin_ip_whitelist: Vec<String>,

    /// Origins allowed by the CORS layer
    pub cors_allowed_origins: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            api_keys: Vec::new(),
            admin_ip_whitelist: vec!["127.0.0.1".to_string(), "::1".to_string()],
            cors_allowed_origins: Vec::new(),
        }
    }
}

/// Route classes with independent admission windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteClass {
    General,
    Api,
    Auth,
    Webhook,
}

impl fmt::Display for RouteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RouteClass::General => "general",
            RouteClass::Api => "api",
            RouteClass::Auth => "auth",
            RouteClass::Webhook => "webhook",
        };
        write!(f, "{s}")
    }
}

/// Fixed-window admission rule for one route class. A maximum of zero
/// disables that identity dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassRule {
    pub window_secs: u64,
    pub per_ip_max: u32,
    pub per_user_max: u32,
    pub per_api_key_max: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub general: ClassRule,
    pub api: ClassRule,
    pub auth: ClassRule,
    pub webhook: ClassRule,
}

impl RateLimitConfig {
    pub fn rule(&self, class: RouteClass) -> &ClassRule {
        match class {
            RouteClass::General => &self.general,
            RouteClass::Api => &self.api,
            RouteClass::Auth => &self.auth,
            RouteClass::Webhook => &self.webhook,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            general: ClassRule {
                window_secs: 60,
                per_ip_max: 120,
                per_user_max: 0,
                per_api_key_max: 0,
            },
            api: ClassRule {
                window_secs: 60,
                per_ip_max: 60,
                per_user_max: 100,
                per_api_key_max: 1000,
            },
            auth: ClassRule {
                window_secs: 900,
                per_ip_max: 5,
                per_user_max: 0,
                per_api_key_max: 0,
            },
            webhook: ClassRule {
                window_secs: 60,
                per_ip_max: 300,
                per_user_max: 0,
                per_api_key_max: 0,
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("IP {ip} is not whitelisted for admin access")]
    IpNotWhitelisted { ip: String },

    #[error("Missing API key")]
    MissingApiKey,

    #[error("Invalid API key")]
    InvalidApiKey,
}

pub type Result<T> = std::result::Result<T, SecurityError>;
