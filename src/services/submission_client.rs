// src/services/submission_client.rs
//! HTTP client for the fiscalization service.
//!
//! Each submission is a single POST with no retry, backoff or idempotency
//! key. Any 2xx status is an acknowledgement; every other outcome (non-2xx
//! status, connection failure, expired deadline) becomes a
//! [`TransportFailure`] and the caller decides whether to try again.

use crate::config::Endpoints;
use crate::error::{FailureKind, TransportFailure};
use crate::services::coupon_signer::SignedPosCoupon;
use serde::Serialize;
use std::time::Duration;

/// JSON envelope sent to the fiscalization service.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum SubmissionRequest {
    /// Body for `/citizen/coupon`.
    Citizen { citizen_id: u64, qr_code: String },
    /// Body for `/pos/coupon`.
    Pos { details: String, signature: String },
}

impl SubmissionRequest {
    pub fn citizen(citizen_id: u64, qr_code: String) -> Self {
        SubmissionRequest::Citizen {
            citizen_id,
            qr_code,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SubmissionRequest::Citizen { .. } => "citizen coupon",
            SubmissionRequest::Pos { .. } => "pos coupon",
        }
    }

    /// Endpoint this envelope must be posted to.
    pub fn endpoint<'a>(&self, endpoints: &'a Endpoints) -> &'a str {
        match self {
            SubmissionRequest::Citizen { .. } => &endpoints.citizen_url,
            SubmissionRequest::Pos { .. } => &endpoints.pos_url,
        }
    }
}

impl From<SignedPosCoupon> for SubmissionRequest {
    fn from(signed: SignedPosCoupon) -> Self {
        SubmissionRequest::Pos {
            details: signed.details,
            signature: signed.signature,
        }
    }
}

/// Successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub status: u16,
    /// Raw response body, passed through unparsed.
    pub body: String,
}

/// Posts signed coupons to one fiscalization service deployment.
#[derive(Clone)]
pub struct SubmissionClient {
    http: reqwest::Client,
    endpoints: Endpoints,
    default_timeout: Duration,
}

impl SubmissionClient {
    /// Creates a client with a default `reqwest` client.
    ///
    /// # Arguments
    /// * `endpoints` - Coupon endpoints of the target deployment
    /// * `default_timeout` - Deadline applied by [`SubmissionClient::submit`]
    pub fn new(endpoints: Endpoints, default_timeout: Duration) -> Self {
        Self::with_http_client(reqwest::Client::new(), endpoints, default_timeout)
    }

    /// Uses a caller-configured `reqwest` client (pooling, TLS, proxies).
    pub fn with_http_client(
        http: reqwest::Client,
        endpoints: Endpoints,
        default_timeout: Duration,
    ) -> Self {
        Self {
            http,
            endpoints,
            default_timeout,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Submits an envelope to its endpoint with the default deadline.
    ///
    /// # Errors
    /// Returns `TransportFailure` for any non-2xx status, connection failure
    /// or expired deadline.
    pub async fn submit(&self, request: &SubmissionRequest) -> Result<Ack, TransportFailure> {
        self.submit_with_deadline(request, self.default_timeout).await
    }

    /// Submits an envelope, failing with `FailureKind::Timeout` once `deadline` expires.
    ///
    /// # Errors
    /// - `FailureKind::Status` for a non-2xx response, even if its body is slow
    /// - `FailureKind::Connection` if the endpoint cannot be reached
    /// - `FailureKind::Timeout` if no complete 2xx response arrives in time
    pub async fn submit_with_deadline(
        &self,
        request: &SubmissionRequest,
        deadline: Duration,
    ) -> Result<Ack, TransportFailure> {
        let url = request.endpoint(&self.endpoints);
        log::debug!("posting {} to {}", request.kind(), url);

        let send = self.http.post(url).json(request).send();
        let response = tokio::time::timeout(deadline, send)
            .await
            .map_err(|_| {
                TransportFailure::new(
                    FailureKind::Timeout,
                    format!("no response from {url} within {deadline:?}"),
                )
            })??;

        let status = response.status();
        let body = tokio::time::timeout(deadline, response.text()).await;

        if !status.is_success() {
            // The status is the failure; a body that never arrives does not change that
            let body = match body {
                Ok(Ok(body)) => body,
                Ok(Err(e)) => format!("status {status}, body unreadable: {e}"),
                Err(_) => format!("status {status}, body timed out"),
            };
            return Err(TransportFailure::new(FailureKind::Status(status.as_u16()), body));
        }

        let body = body
            .map_err(|_| TransportFailure::new(FailureKind::Timeout, "response body timed out"))??;
        Ok(Ack {
            status: status.as_u16(),
            body,
        })
    }

    /// Submits an envelope and logs the outcome.
    ///
    /// Failures are reported through the return value, never panicked on, so
    /// one coupon kind failing does not stop the other from being sent.
    pub async fn submit_logged(&self, request: &SubmissionRequest) -> Result<Ack, TransportFailure> {
        let result = self.submit(request).await;
        match &result {
            Ok(ack) => log::info!("{} sent successfully (status {})", request.kind(), ack.status),
            Err(failure) => log::error!("error sending {}: {}", request.kind(), failure),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn pos_request() -> SubmissionRequest {
        SubmissionRequest::from(SignedPosCoupon {
            details: "Y291cG9u".to_string(),
            signature: "c2lnbmF0dXJl".to_string(),
        })
    }

    fn citizen_request() -> SubmissionRequest {
        SubmissionRequest::citizen(1, "Y291cG9u|c2lnbmF0dXJl".to_string())
    }

    fn client_for(base_url: &str) -> SubmissionClient {
        SubmissionClient::new(Endpoints::from_base_url(base_url), Duration::from_secs(5))
    }

    #[test]
    fn test_envelope_shapes() {
        assert_eq!(
            serde_json::to_value(citizen_request()).unwrap(),
            json!({ "citizen_id": 1, "qr_code": "Y291cG9u|c2lnbmF0dXJl" })
        );
        assert_eq!(
            serde_json::to_value(pos_request()).unwrap(),
            json!({ "details": "Y291cG9u", "signature": "c2lnbmF0dXJl" })
        );
    }

    #[tokio::test]
    async fn test_success_statuses() {
        for status in [200, 201, 204] {
            let mut server = mockito::Server::new_async().await;
            let mock = server
                .mock("POST", "/pos/coupon")
                .match_header("content-type", "application/json")
                .match_body(Matcher::Json(json!({
                    "details": "Y291cG9u",
                    "signature": "c2lnbmF0dXJl"
                })))
                .with_status(status)
                .create_async()
                .await;

            let ack = client_for(&server.url()).submit(&pos_request()).await.unwrap();
            assert_eq!(ack.status, status as u16);
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn test_citizen_coupon_goes_to_citizen_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/citizen/coupon")
            .match_body(Matcher::Json(json!({
                "citizen_id": 1,
                "qr_code": "Y291cG9u|c2lnbmF0dXJl"
            })))
            .with_status(200)
            .with_body("{\"status\":\"ok\"}")
            .create_async()
            .await;

        let ack = client_for(&server.url())
            .submit_logged(&citizen_request())
            .await
            .unwrap();
        assert_eq!(ack.body, "{\"status\":\"ok\"}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_statuses_are_transport_failures() {
        for status in [400, 500] {
            let mut server = mockito::Server::new_async().await;
            let mock = server
                .mock("POST", "/citizen/coupon")
                .with_status(status)
                .with_body("rejected")
                .expect(1)
                .create_async()
                .await;

            let failure = client_for(&server.url())
                .submit(&citizen_request())
                .await
                .unwrap_err();
            assert_eq!(failure.kind, FailureKind::Status(status as u16));
            assert_eq!(failure.message, "rejected");

            // Exactly one attempt, no retry
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Bind then drop a listener so the port is known to be closed
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let failure = client_for(&format!("http://{addr}"))
            .submit(&pos_request())
            .await
            .unwrap_err();
        assert_eq!(failure.kind, FailureKind::Connection);
    }

    #[tokio::test]
    async fn test_error_status_kept_when_body_stalls() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Sends a 503 head promising a body that never comes
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 503 Service Unavailable\r\ncontent-length: 100\r\n\r\npartial")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        });

        let failure = client_for(&format!("http://{addr}"))
            .submit_with_deadline(&pos_request(), Duration::from_millis(300))
            .await
            .unwrap_err();
        assert_eq!(failure.kind, FailureKind::Status(503));

        server.abort();
    }

    #[tokio::test]
    async fn test_deadline_expiry_is_timeout() {
        // Accepts connections but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            loop {
                if let Ok((socket, _)) = listener.accept().await {
                    held.push(socket);
                }
            }
        });

        let failure = client_for(&format!("http://{addr}"))
            .submit_with_deadline(&pos_request(), Duration::from_millis(200))
            .await
            .unwrap_err();
        assert_eq!(failure.kind, FailureKind::Timeout);

        server.abort();
    }
}
