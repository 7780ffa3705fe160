pub mod api;
pub mod config;
pub mod monitoring;
pub mod security;
pub mod webhook;

pub use config::Config;

// Re-export monitoring types for convenience
pub use monitoring::{
    Alert, AlertSeverity, ConnectionMonitor, HealthStatus, HealthSummary, QueryAnalyzer,
    QueryOperation, SlowQueryLog, SlowQueryLogEntry,
};

// Re-export admission-control types
pub use security::{IpWhitelist, RateLimiter, RouteClass, SecurityError};

// Re-export webhook types
pub use webhook::{DeliveryOutcome, WebhookEmitter, WebhookEvent};
