//! Telegram Bot API transport.
//!
//! Only the two calls the relay needs: `sendPhoto` and `sendMessage`, both
//! with HTML captions, link previews off and silent notifications.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Result;
use crate::models::TelegramConfig;
use crate::utils::http;

/// Description the Bot API returns when it cannot download a photo URL.
pub const UNFETCHABLE_PHOTO: &str = "Bad Request: wrong file identifier/HTTP URL specified";

/// A rejected or failed transport request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The API answered with an error body
    #[error("Bot API rejected request ({status}): {description}")]
    Api { status: u16, description: String },

    /// The request never got an answer
    #[error("Request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// Whether the API refused the post because it could not fetch the photo.
    pub fn is_unfetchable_photo(&self) -> bool {
        matches!(
            self,
            TransportError::Api { status: 400, description } if description == UNFETCHABLE_PHOTO
        )
    }
}

/// Outbound channel posting seam.
#[async_trait]
pub trait PublishTransport: Send + Sync {
    /// Post a photo with an HTML caption.
    async fn send_photo(
        &self,
        chat_id: i64,
        photo_url: &str,
        caption: &str,
    ) -> std::result::Result<(), TransportError>;

    /// Post a plain HTML text message.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
    ) -> std::result::Result<(), TransportError>;
}

#[derive(Debug, Serialize)]
struct SendPhotoParams<'a> {
    chat_id: i64,
    parse_mode: &'static str,
    photo: &'a str,
    caption: &'a str,
    disable_web_page_preview: bool,
    disable_notification: bool,
}

#[derive(Debug, Serialize)]
struct SendMessageParams<'a> {
    chat_id: i64,
    parse_mode: &'static str,
    text: &'a str,
    disable_web_page_preview: bool,
    disable_notification: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
}

/// Bot API client over `reqwest`.
pub struct TelegramTransport {
    client: reqwest::Client,
    api_url: String,
}

impl TelegramTransport {
    /// Create a transport for the configured bot, optionally through a proxy.
    pub fn new(config: &TelegramConfig, proxy: Option<&str>) -> Result<Self> {
        let client = http::create_transport_client(config, proxy)?;
        let api_url = format!(
            "{}/bot{}",
            config.api_base.trim_end_matches('/'),
            config.bot_token
        );

        Ok(Self { client, api_url })
    }

    async fn call<T: Serialize + Sync>(
        &self,
        method: &str,
        params: &T,
    ) -> std::result::Result<(), TransportError> {
        let response = self
            .client
            .post(format!("{}/{}", self.api_url, method))
            .json(params)
            .send()
            .await
            // The URL carries the bot token.
            .map_err(|e| TransportError::Request(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Request(e.without_url().to_string()))?;

        match serde_json::from_str::<ApiResponse>(&body) {
            Ok(api) if status.is_success() && api.ok => Ok(()),
            Ok(api) => Err(TransportError::Api {
                status: api.error_code.unwrap_or(status.as_u16()),
                description: api.description.unwrap_or(body),
            }),
            Err(_) => Err(TransportError::Api {
                status: status.as_u16(),
                description: body,
            }),
        }
    }
}

#[async_trait]
impl PublishTransport for TelegramTransport {
    async fn send_photo(
        &self,
        chat_id: i64,
        photo_url: &str,
        caption: &str,
    ) -> std::result::Result<(), TransportError> {
        let params = SendPhotoParams {
            chat_id,
            parse_mode: "HTML",
            photo: photo_url,
            caption,
            disable_web_page_preview: true,
            disable_notification: true,
        };
        self.call("sendPhoto", &params).await
    }

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
    ) -> std::result::Result<(), TransportError> {
        let params = SendMessageParams {
            chat_id,
            parse_mode: "HTML",
            text,
            disable_web_page_preview: true,
            disable_notification: true,
        };
        self.call("sendMessage", &params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn transport_for(server: &mockito::ServerGuard) -> TelegramTransport {
        let config = TelegramConfig {
            api_base: server.url(),
            bot_token: "123:abc".to_string(),
            ..TelegramConfig::default()
        };
        TelegramTransport::new(&config, None).unwrap()
    }

    #[test]
    fn test_unfetchable_photo_detection() {
        let recognized = TransportError::Api {
            status: 400,
            description: UNFETCHABLE_PHOTO.to_string(),
        };
        assert!(recognized.is_unfetchable_photo());

        let other_status = TransportError::Api {
            status: 403,
            description: UNFETCHABLE_PHOTO.to_string(),
        };
        assert!(!other_status.is_unfetchable_photo());

        let other_text = TransportError::Api {
            status: 400,
            description: "Bad Request: chat not found".to_string(),
        };
        assert!(!other_text.is_unfetchable_photo());
        assert!(!TransportError::Request("timeout".into()).is_unfetchable_photo());
    }

    #[tokio::test]
    async fn test_send_photo_posts_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bot123:abc/sendPhoto")
            .match_body(Matcher::PartialJson(json!({
                "chat_id": -100,
                "parse_mode": "HTML",
                "photo": "https://r.hpoi.net/a.jpg",
                "caption": "hello",
                "disable_web_page_preview": true,
                "disable_notification": true,
            })))
            .with_status(200)
            .with_body(r#"{"ok":true,"result":{}}"#)
            .create_async()
            .await;

        let transport = transport_for(&server);
        transport
            .send_photo(-100, "https://r.hpoi.net/a.jpg", "hello")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_body_is_decoded() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/bot123:abc/sendPhoto")
            .with_status(400)
            .with_body(format!(
                r#"{{"ok":false,"error_code":400,"description":"{UNFETCHABLE_PHOTO}"}}"#
            ))
            .create_async()
            .await;

        let transport = transport_for(&server);
        let err = transport
            .send_photo(-100, "https://r.hpoi.net/a.jpg", "hello")
            .await
            .unwrap_err();
        assert!(err.is_unfetchable_photo());
    }

    #[tokio::test]
    async fn test_send_message_non_json_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/bot123:abc/sendMessage")
            .with_status(502)
            .with_body("Bad Gateway")
            .create_async()
            .await;

        let transport = transport_for(&server);
        let err = transport.send_message(-100, "hello").await.unwrap_err();
        assert_eq!(
            err,
            TransportError::Api {
                status: 502,
                description: "Bad Gateway".to_string()
            }
        );
    }
}
