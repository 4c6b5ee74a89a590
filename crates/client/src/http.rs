use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqflow_core::config::ApiConfig;
use reqflow_core::wire::{Attachment, HttpMethod, Outbound, Payload, ResponseEnvelope};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::{ApiError, TokenSource, Transport};
use crate::retry::RetryPolicy;

/// reqwest-backed transport with bearer auth and 429 backoff.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
    retry: RetryPolicy,
}

impl HttpTransport {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        tokens: Arc<dyn TokenSource>,
        retry: RetryPolicy,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| ApiError::Transport(error.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url, tokens, retry })
    }

    pub fn from_config(api: &ApiConfig, tokens: Arc<dyn TokenSource>) -> Result<Self, ApiError> {
        Self::new(
            api.base_url.clone(),
            Duration::from_secs(api.timeout_secs),
            tokens,
            RetryPolicy::from_config(api),
        )
    }

    async fn build(&self, call: &Outbound) -> Result<RequestBuilder, ApiError> {
        let url = format!("{}{}", self.base_url, call.endpoint.path());
        let mut builder = match call.endpoint.method() {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
            HttpMethod::Patch => self.client.patch(url),
            HttpMethod::Delete => self.client.delete(url),
        };

        if call.endpoint.requires_auth() {
            if let Some(token) = self.tokens.bearer_token().await {
                builder = builder.bearer_auth(token.expose_secret());
            }
        }

        Ok(match &call.payload {
            Payload::Empty => builder,
            Payload::Json(body) => builder.json(body),
            Payload::Multipart { fields, files } => builder.multipart(multipart_form(fields, files)?),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, call: &Outbound) -> Result<ResponseEnvelope, ApiError> {
        let path = call.endpoint.path();
        let mut attempt = 0;

        loop {
            let response = self
                .build(call)
                .await?
                .send()
                .await
                .map_err(|error| ApiError::Transport(error.to_string()))?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                if !self.retry.should_retry(attempt) {
                    return Err(ApiError::RateLimited { attempts: attempt + 1 });
                }
                let delay = self.retry.backoff(attempt);
                warn!(
                    event_name = "client.http.rate_limited",
                    path = %path,
                    attempt = attempt + 1,
                    max_retries = self.retry.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "backend rate limited the call; retrying"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
                continue;
            }

            let bytes =
                response.bytes().await.map_err(|error| ApiError::Transport(error.to_string()))?;

            if !status.is_success() {
                return Err(ApiError::Status {
                    status: status.as_u16(),
                    message: error_message(&bytes).unwrap_or_else(|| status.to_string()),
                });
            }

            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice::<Value>(&bytes)
                    .map_err(|error| ApiError::Decode(error.to_string()))?
            };
            debug!(
                event_name = "client.http.response",
                path = %path,
                status = status.as_u16(),
                attempts = attempt + 1,
                "backend call completed"
            );
            return Ok(ResponseEnvelope::from_body(body));
        }
    }
}

fn multipart_form(fields: &[(String, String)], files: &[Attachment]) -> Result<Form, ApiError> {
    let mut form = Form::new();
    for (name, value) in fields {
        form = form.text(name.clone(), value.clone());
    }
    for file in files {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|error| ApiError::Transport(error.to_string()))?;
        form = form.part("files", part);
    }
    Ok(form)
}

fn error_message(bytes: &[u8]) -> Option<String> {
    let body: Value = serde_json::from_slice(bytes).ok()?;
    body.get("message").and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use reqflow_core::domain::request::RequestKind;
    use reqflow_core::wire::{Endpoint, Outbound, ServerVerdict};
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::HttpTransport;
    use crate::api::{ApiError, StaticToken, Transport};
    use crate::retry::RetryPolicy;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy { max_retries: 3, base_delay_ms: 1, max_delay_ms: 4 }
    }

    fn transport(server: &MockServer) -> HttpTransport {
        HttpTransport::new(
            server.uri(),
            Duration::from_secs(5),
            Arc::new(StaticToken(SecretString::from("tok-1".to_owned()))),
            fast_retry(),
        )
        .expect("transport")
    }

    #[tokio::test]
    async fn attaches_bearer_token_and_decodes_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": 200, "data": []})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let envelope =
            transport(&server).send(&Outbound::bodyless(Endpoint::Projects)).await.expect("send");
        assert_eq!(envelope.data, Some(json!([])));
    }

    #[tokio::test]
    async fn retries_rate_limited_calls_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/purchase-requests/save"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/purchase-requests/save"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"status": 201, "message": "Saved"})),
            )
            .mount(&server)
            .await;

        let call = Outbound::json(Endpoint::Save(RequestKind::Purchase), json!({"department": "Ops"}));
        let envelope = transport(&server).send(&call).await.expect("send after retries");
        assert!(matches!(envelope.verdict(), ServerVerdict::Accepted { .. }));
        let received = server.received_requests().await.expect("recorded requests");
        assert_eq!(received.len(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_three_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/reviewers"))
            .respond_with(ResponseTemplate::new(429))
            .expect(4)
            .mount(&server)
            .await;

        let error = transport(&server)
            .send(&Outbound::bodyless(Endpoint::Reviewers))
            .await
            .expect_err("exhausted retries");
        assert_eq!(error, ApiError::RateLimited { attempts: 4 });
    }

    #[tokio::test]
    async fn non_success_http_is_a_transport_failure_with_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "jwt expired"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let error =
            transport(&server).send(&Outbound::bodyless(Endpoint::Me)).await.expect_err("401");
        assert_eq!(error, ApiError::Status { status: 401, message: "jwt expired".to_owned() });
    }

    #[tokio::test]
    async fn login_is_sent_without_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": 200})))
            .expect(1)
            .mount(&server)
            .await;

        transport(&server)
            .send(&Outbound::json(Endpoint::Login, json!({"email": "a@b.org", "password": "pw"})))
            .await
            .expect("login call");

        let received = server.received_requests().await.expect("recorded requests");
        assert!(received[0].headers.get("authorization").is_none());
    }
}
