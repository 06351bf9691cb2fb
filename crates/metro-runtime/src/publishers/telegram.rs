//! Broadcast channel: one Bot API `sendMessage` per configured chat.

use async_trait::async_trait;
use metro_core::settings::TelegramConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{error_from_response, DestinationFailure, PublishError, Publisher};

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error_code: i64,
    #[serde(default)]
    description: String,
}

fn decode_error(body: &str) -> Option<(i64, String)> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    Some((parsed.error_code, parsed.description))
}

pub struct TelegramPublisher {
    client: Client,
    config: TelegramConfig,
}

impl TelegramPublisher {
    pub fn new(client: Client, config: TelegramConfig) -> Self {
        Self { client, config }
    }

    /// Method URL. Contains the bot token, so it must never be logged.
    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.config.api_base, self.config.token, method)
    }

    async fn send(&self, chat_id: &str, text: &str) -> Result<(), PublishError> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&SendMessage { chat_id, text })
            .send()
            .await
            .map_err(|e| PublishError::Http(e.without_url()))?;

        if response.status().is_success() {
            return Ok(());
        }
        Err(error_from_response(response, decode_error).await)
    }
}

#[async_trait]
impl Publisher for TelegramPublisher {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn verify(&self) -> Result<(), PublishError> {
        let response = self
            .client
            .get(self.method_url("getMe"))
            .send()
            .await
            .map_err(|e| PublishError::Http(e.without_url()))?;

        if response.status().is_success() {
            debug!("telegram token verified");
            return Ok(());
        }
        Err(error_from_response(response, decode_error).await)
    }

    /// Send `message` to every chat. A failing chat does not stop delivery to
    /// the others; all failures are reported together afterwards.
    async fn publish(&self, message: &str) -> Result<(), PublishError> {
        info!(
            channel = "telegram",
            destinations = self.config.chat_ids.len(),
            text = message,
            "publishing"
        );

        let mut failures = Vec::new();
        for chat_id in &self.config.chat_ids {
            match self.send(chat_id, message).await {
                Ok(()) => debug!(chat_id = %chat_id, "delivered"),
                Err(e) => {
                    warn!(chat_id = %chat_id, error = %e, "delivery failed");
                    failures.push(DestinationFailure {
                        destination: chat_id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(PublishError::Destinations {
                total: self.config.chat_ids.len(),
                failures,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "123:abc";
    const SEND_PATH: &str = "/bot123:abc/sendMessage";

    fn publisher(server: &MockServer, chat_ids: &[&str]) -> TelegramPublisher {
        TelegramPublisher::new(
            Client::new(),
            TelegramConfig {
                token: TOKEN.to_string(),
                chat_ids: chat_ids.iter().map(|s| s.to_string()).collect(),
                api_base: server.uri(),
            },
        )
    }

    fn ok_response() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_string(r#"{"ok":true,"result":{"message_id":1}}"#)
    }

    #[test]
    fn test_decode_error() {
        let body = r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#;
        assert_eq!(
            decode_error(body),
            Some((400, "Bad Request: chat not found".to_string()))
        );
        assert_eq!(decode_error("gateway timeout"), None);
    }

    #[tokio::test]
    async fn test_publish_sends_to_every_chat_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SEND_PATH))
            .respond_with(ok_response())
            .expect(3)
            .mount(&server)
            .await;

        publisher(&server, &["42", "@metro_status", "-100123"])
            .publish("✅ Linha Azul: Circulação normal.")
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let chat_ids: Vec<String> = requests
            .iter()
            .map(|r| {
                let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
                body["chat_id"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(chat_ids, vec!["42", "@metro_status", "-100123"]);
    }

    #[tokio::test]
    async fn test_publish_sends_text_unchanged() {
        let server = MockServer::start().await;
        let message = "⚠️ Linha Amarela: Avaria na linha.";
        Mock::given(method("POST"))
            .and(path(SEND_PATH))
            .and(body_json(serde_json::json!({ "chat_id": "42", "text": message })))
            .respond_with(ok_response())
            .expect(1)
            .mount(&server)
            .await;

        publisher(&server, &["42"]).publish(message).await.unwrap();
    }

    #[tokio::test]
    async fn test_publish_continues_past_failed_destination() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SEND_PATH))
            .and(body_partial_json(serde_json::json!({ "chat_id": "7" })))
            .respond_with(ResponseTemplate::new(400).set_body_string(
                r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SEND_PATH))
            .respond_with(ok_response())
            .expect(2)
            .mount(&server)
            .await;

        let err = publisher(&server, &["42", "7", "99"])
            .publish("Olá")
            .await
            .unwrap_err();

        match err {
            PublishError::Destinations { total, failures } => {
                assert_eq!(total, 3);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].destination, "7");
                assert!(failures[0].reason.contains("chat not found"));
            }
            other => panic!("expected destinations error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_error_never_leaks_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = publisher(&server, &["42"]).publish("Olá").await.unwrap_err();

        assert!(!err.to_string().contains(TOKEN));
    }

    #[tokio::test]
    async fn test_truncated_error_body_never_leaks_token() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            // Promise more body than is sent, then hang up.
            let _ = socket
                .write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\n\r\npartial")
                .await;
        });

        let publisher = TelegramPublisher::new(
            Client::new(),
            TelegramConfig {
                token: TOKEN.to_string(),
                chat_ids: vec!["42".to_string()],
                api_base: format!("http://{}", addr),
            },
        );
        let err = publisher.publish("Olá").await.unwrap_err();

        match &err {
            PublishError::Destinations { failures, .. } => {
                assert!(failures[0].reason.starts_with("HTTP request failed"));
            }
            other => panic!("expected destinations error, got {other:?}"),
        }
        assert!(!err.to_string().contains(TOKEN));
    }

    #[tokio::test]
    async fn test_verify_calls_get_me() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bot123:abc/getMe"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true,"result":{}}"#))
            .expect(1)
            .mount(&server)
            .await;

        publisher(&server, &["42"]).verify().await.unwrap();
    }

    #[tokio::test]
    async fn test_verify_rejected_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bot123:abc/getMe"))
            .respond_with(ResponseTemplate::new(401).set_body_string(
                r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#,
            ))
            .mount(&server)
            .await;

        let err = publisher(&server, &["42"]).verify().await.unwrap_err();
        assert!(matches!(err, PublishError::Api { code: 401, .. }));
    }
}
