//! Purchase notification delivery.
//!
//! Notification is best-effort: callers log failures and carry on.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{SessionError, SessionResult};
use crate::storefront::BoxFuture;

/// Default ServerChan endpoint; `{key}` is replaced by the send key.
pub const SERVERCHAN_URL_TEMPLATE: &str = "https://sctapi.ftqq.com/{key}.send";

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Push notification sink.
pub trait Notifier: Send + Sync {
    /// Deliver one message.
    fn notify<'a>(&'a self, title: &'a str, message: &'a str) -> BoxFuture<'a, SessionResult<()>>;
}

/// Notifier that only writes the message to the log.
///
/// Used when push delivery is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify<'a>(&'a self, title: &'a str, message: &'a str) -> BoxFuture<'a, SessionResult<()>> {
        Box::pin(async move {
            info!(title, message, "Notification");
            Ok(())
        })
    }
}

#[derive(Debug, Serialize)]
struct ServerChanForm<'a> {
    title: &'a str,
    desp: &'a str,
}

#[derive(Debug, Deserialize)]
struct ServerChanResponse {
    code: i64,
    #[serde(default)]
    message: Option<String>,
}

/// WeChat push through ServerChan.
pub struct ServerChanNotifier {
    client: Client,
    url: String,
}

impl ServerChanNotifier {
    /// Create a notifier for the given send key.
    pub fn new(send_key: &str) -> SessionResult<Self> {
        Self::with_url_template(send_key, SERVERCHAN_URL_TEMPLATE)
    }

    /// Create a notifier against a custom endpoint template containing `{key}`.
    pub fn with_url_template(send_key: &str, template: &str) -> SessionResult<Self> {
        if send_key.trim().is_empty() {
            return Err(SessionError::Notify("ServerChan send key is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(NOTIFY_TIMEOUT)
            .build()
            .map_err(|e| SessionError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: template.replace("{key}", send_key.trim()),
        })
    }

    /// Endpoint this notifier posts to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Notifier for ServerChanNotifier {
    fn notify<'a>(&'a self, title: &'a str, message: &'a str) -> BoxFuture<'a, SessionResult<()>> {
        Box::pin(async move {
            let response = self
                .client
                .post(&self.url)
                .form(&ServerChanForm {
                    title,
                    desp: message,
                })
                .send()
                .await
                .map_err(|e| SessionError::HttpClient(format!("HTTP request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(SessionError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let body: ServerChanResponse = response
                .json()
                .await
                .map_err(|e| SessionError::Parse(format!("ServerChan response: {e}")))?;

            if body.code != 0 {
                return Err(SessionError::Notify(format!(
                    "ServerChan code {}: {}",
                    body.code,
                    body.message.unwrap_or_default()
                )));
            }

            debug!(title, "ServerChan push delivered");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serverchan_url_from_key() {
        let notifier = ServerChanNotifier::new(" SCT123 ").unwrap();
        assert_eq!(notifier.url(), "https://sctapi.ftqq.com/SCT123.send");
    }

    #[test]
    fn test_serverchan_rejects_empty_key() {
        assert!(matches!(
            ServerChanNotifier::new(""),
            Err(SessionError::Notify(_))
        ));
    }

    #[test]
    fn test_serverchan_response_parsing() {
        let ok: ServerChanResponse = serde_json::from_str(r#"{"code":0,"data":{}}"#).unwrap();
        assert_eq!(ok.code, 0);
        let err: ServerChanResponse =
            serde_json::from_str(r#"{"code":40001,"message":"bad key"}"#).unwrap();
        assert_eq!(err.message.as_deref(), Some("bad key"));
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        assert!(LogNotifier.notify("restock", "hello").await.is_ok());
    }

    mod delivery {
        use super::*;
        use wiremock::matchers::{body_string_contains, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn notifier_for(server: &MockServer) -> ServerChanNotifier {
            ServerChanNotifier::with_url_template("SCT123", &format!("{}/{{key}}.send", server.uri()))
                .unwrap()
        }

        #[tokio::test]
        async fn test_push_delivered() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/SCT123.send"))
                .and(body_string_contains("title=restock"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(serde_json::json!({ "code": 0 })),
                )
                .expect(1)
                .mount(&server)
                .await;

            notifier_for(&server)
                .notify("restock", "1001 purchased")
                .await
                .unwrap();
        }

        #[tokio::test]
        async fn test_nonzero_code_is_notify_error() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/SCT123.send"))
                .respond_with(ResponseTemplate::new(200).set_body_json(
                    serde_json::json!({ "code": 40001, "message": "bad key" }),
                ))
                .mount(&server)
                .await;

            let err = notifier_for(&server).notify("t", "m").await.unwrap_err();
            assert_eq!(
                err,
                SessionError::Notify("ServerChan code 40001: bad key".to_string())
            );
        }

        #[tokio::test]
        async fn test_server_error_is_status() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/SCT123.send"))
                .respond_with(ResponseTemplate::new(500))
                .mount(&server)
                .await;

            let err = notifier_for(&server).notify("t", "m").await.unwrap_err();
            assert!(matches!(err, SessionError::Status { status: 500, .. }));
        }

        #[tokio::test]
        async fn test_malformed_reply_is_parse_error() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/SCT123.send"))
                .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
                .mount(&server)
                .await;

            let err = notifier_for(&server).notify("t", "m").await.unwrap_err();
            assert!(matches!(err, SessionError::Parse(_)));
        }
    }
}
