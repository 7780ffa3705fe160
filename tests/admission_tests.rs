use std::time::Duration;

use crm_monitor::security::{ClassRule, RateLimitConfig, RateLimiter, RouteClass};

fn auth_rule(per_ip_max: u32, window_secs: u64) -> RateLimitConfig {
    RateLimitConfig {
        auth: ClassRule {
            window_secs,
            per_ip_max,
            per_user_max: 0,
            per_api_key_max: 0,
        },
        ..RateLimitConfig::default()
    }
}

#[tokio::test]
async fn sixth_auth_request_in_window_is_rejected() {
    let limiter = RateLimiter::new(auth_rule(5, 900));

    for i in 0..5 {
        assert!(
            limiter
                .check_request(RouteClass::Auth, "198.51.100.7", None, None)
                .await
                .is_ok(),
            "request {} should be admitted",
            i + 1
        );
    }
    assert!(limiter
        .check_request(RouteClass::Auth, "198.51.100.7", None, None)
        .await
        .is_err());
}

#[tokio::test]
async fn elapsed_window_admits_and_resets() {
    let limiter = RateLimiter::new(auth_rule(2, 1));

    assert!(limiter
        .check_request(RouteClass::Auth, "198.51.100.7", None, None)
        .await
        .is_ok());
    assert!(limiter
        .check_request(RouteClass::Auth, "198.51.100.7", None, None)
        .await
        .is_ok());
    assert!(limiter
        .check_request(RouteClass::Auth, "198.51.100.7", None, None)
        .await
        .is_err());

    tokio::time::sleep(Duration::from_millis(1100)).await;

    // Fresh window: admitted, and the count restarted at 1 so a second
    // request is still within the maximum
    assert!(limiter
        .check_request(RouteClass::Auth, "198.51.100.7", None, None)
        .await
        .is_ok());
    assert!(limiter
        .check_request(RouteClass::Auth, "198.51.100.7", None, None)
        .await
        .is_ok());
}

#[tokio::test]
async fn identity_dimensions_reject_independently() {
    let config = RateLimitConfig {
        api: ClassRule {
            window_secs: 60,
            per_ip_max: 2,
            per_user_max: 3,
            per_api_key_max: 1000,
        },
        ..RateLimitConfig::default()
    };
    let limiter = RateLimiter::new(config);

    // Two requests from one IP exhaust the IP budget
    for _ in 0..2 {
        assert!(limiter
            .check_request(RouteClass::Api, "203.0.113.1", Some("advisor-1"), None)
            .await
            .is_ok());
    }
    assert!(limiter
        .check_request(RouteClass::Api, "203.0.113.1", Some("advisor-1"), None)
        .await
        .is_err());

    // A different IP and user is untouched by the exhausted budgets
    assert!(limiter
        .check_request(RouteClass::Api, "203.0.113.2", Some("advisor-2"), None)
        .await
        .is_ok());

    // The throttled user is rejected even from a fresh IP once the
    // user budget runs out
    assert!(limiter
        .check_request(RouteClass::Api, "203.0.113.3", Some("advisor-1"), None)
        .await
        .is_ok());
    assert!(limiter
        .check_request(RouteClass::Api, "203.0.113.4", Some("advisor-1"), None)
        .await
        .is_err());
}

#[tokio::test]
async fn default_rules_match_route_classes() {
    let config = RateLimitConfig::default();
    assert_eq!(config.auth.per_ip_max, 5);
    assert_eq!(config.auth.window_secs, 900);
    assert_eq!(config.api.per_ip_max, 60);
    assert_eq!(config.api.per_user_max, 100);
    assert_eq!(config.api.per_api_key_max, 1000);
}
