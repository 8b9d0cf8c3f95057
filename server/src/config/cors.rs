use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use super::Config;

const PREFLIGHT_MAX_AGE_SECS: u64 = 86400;

pub fn create_cors_layer(config: &Config) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allowed_origins(&config.allowed_origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([
            header::CONTENT_LENGTH,
            header::CONTENT_TYPE,
            header::WWW_AUTHENTICATE,
        ])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(PREFLIGHT_MAX_AGE_SECS))
}

fn parse_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => {
                tracing::debug!("CORS: Allowing origin: {}", origin);
                Some(value)
            }
            Err(e) => {
                tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect()
}

fn allowed_origins(origins: &[String]) -> AllowOrigin {
    let origins = parse_origins(origins);

    // Credentials are allowed, so a wildcard origin would be rejected by tower-http.
    if origins.is_empty() {
        tracing::warn!("CORS: No valid origins configured, allowing the request origin");
        AllowOrigin::mirror_request()
    } else {
        tracing::info!("CORS: Configured with {} allowed origin(s)", origins.len());
        AllowOrigin::list(origins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_origins_are_skipped() {
        let origins = vec![
            "https://convene.example".to_string(),
            "bad\norigin".to_string(),
        ];
        let parsed = parse_origins(&origins);
        assert_eq!(parsed, vec![HeaderValue::from_static("https://convene.example")]);
    }

    #[test]
    fn test_create_cors_layer() {
        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://localhost/convene".to_string()),
            _ => None,
        })
        .unwrap();
        let _layer = create_cors_layer(&config);
    }
}
