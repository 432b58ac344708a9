// src/utils/http.rs

//! HTTP client utilities.

use reqwest::Proxy;

use crate::error::{AppError, Result};
use crate::models::{FeedConfig, TelegramConfig};

/// Create the client used for hpoi.net listing and detail requests.
pub fn create_feed_client(config: &FeedConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout())
        .build()?;
    Ok(client)
}

/// Create the client used for Bot API requests, optionally through a proxy.
pub fn create_transport_client(
    config: &TelegramConfig,
    proxy: Option<&str>,
) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(config.timeout());

    if let Some(proxy_url) = proxy {
        let proxy = Proxy::all(proxy_url)
            .map_err(|e| AppError::config(format!("Invalid proxy '{proxy_url}': {e}")))?;
        log::debug!("Routing transport requests through {}", proxy_url);
        builder = builder.proxy(proxy);
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clients_build_from_defaults() {
        assert!(create_feed_client(&FeedConfig::default()).is_ok());
        assert!(create_transport_client(&TelegramConfig::default(), None).is_ok());
    }

    #[test]
    fn test_transport_client_with_proxy() {
        let config = TelegramConfig::default();
        assert!(create_transport_client(&config, Some("http://localhost:1087")).is_ok());
    }
}
