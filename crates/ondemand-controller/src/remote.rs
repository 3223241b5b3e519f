//! HTTP control-plane client.
//!
//! Each operation is one `POST {endpoint}/{Action}` with a JSON body of
//! `{"InstanceIds": [...]}`, bounded by the configured timeout. A fresh
//! HTTP/1 connection is opened per call; the workload is a handful of
//! calls every few minutes.

use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use serde::Serialize;
use tracing::{debug, warn};

use ondemand_core::{InstanceRef, InstanceState};

use crate::controller::{ControllerFuture, InstanceController};
use crate::describe::DescribeInstancesOutput;
use crate::error::{ControllerError, ControllerResult, Operation};

/// Longest provider error body carried into an error message.
const MAX_ERROR_BODY: usize = 256;

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct InstanceIdsRequest<'a> {
    instance_ids: [&'a str; 1],
}

/// Controller backed by a remote control plane.
#[derive(Debug, Clone)]
pub struct HttpController {
    /// `host:port` to connect to and send as the Host header.
    authority: String,
    /// Path prefix without a trailing slash.
    base_path: String,
    region: Option<String>,
    token: Option<String>,
    timeout: Duration,
}

impl HttpController {
    /// Create a controller for an `http://` endpoint.
    pub fn new(endpoint: &str, timeout: Duration) -> ControllerResult<Self> {
        let uri: http::Uri = endpoint
            .parse()
            .map_err(|e| ControllerError::InvalidEndpoint(format!("{endpoint:?}: {e}")))?;

        if uri.scheme_str() != Some("http") {
            return Err(ControllerError::InvalidEndpoint(format!(
                "{endpoint:?}: only http:// endpoints are supported"
            )));
        }
        let authority = uri
            .authority()
            .ok_or_else(|| ControllerError::InvalidEndpoint(format!("{endpoint:?}: missing host")))?;
        let port = authority.port_u16().unwrap_or(80);

        Ok(Self {
            authority: format!("{}:{port}", authority.host()),
            base_path: uri.path().trim_end_matches('/').to_string(),
            region: None,
            token: None,
            timeout,
        })
    }

    /// Region sent with every call.
    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    /// Bearer credential sent with every call.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issue one control-plane call and return the 2xx response body.
    async fn call(&self, operation: Operation, instance: &InstanceRef) -> ControllerResult<Bytes> {
        debug!(%operation, %instance, authority = %self.authority, "provider call");

        match tokio::time::timeout(self.timeout, self.send(operation, instance)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%operation, %instance, timeout = ?self.timeout, "provider call timed out");
                Err(ControllerError::Timeout {
                    operation,
                    after: self.timeout,
                })
            }
        }
    }

    async fn send(&self, operation: Operation, instance: &InstanceRef) -> ControllerResult<Bytes> {
        let request_err = |message: String| ControllerError::Request { operation, message };

        let body = serde_json::to_vec(&InstanceIdsRequest {
            instance_ids: [instance.as_str()],
        })
        .map_err(|e| request_err(e.to_string()))?;

        let stream = tokio::net::TcpStream::connect(&self.authority)
            .await
            .map_err(|e| ControllerError::Connect {
                operation,
                message: e.to_string(),
            })?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| ControllerError::Connect {
                operation,
                message: e.to_string(),
            })?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let uri = format!("http://{}{}/{}", self.authority, self.base_path, operation.action());
        let mut builder = http::Request::builder()
            .method(http::Method::POST)
            .uri(&uri)
            .header(http::header::HOST, &self.authority)
            .header(http::header::CONTENT_TYPE, "application/json")
            .header(http::header::USER_AGENT, "ondemand-controller/0.1");
        if let Some(region) = &self.region {
            builder = builder.header("x-provider-region", region);
        }
        if let Some(token) = &self.token {
            builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = builder
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| request_err(e.to_string()))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| request_err(e.to_string()))?;
        let status = resp.status();
        let bytes = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| request_err(e.to_string()))?
            .to_bytes();

        check_status(operation, status, &bytes)?;
        Ok(bytes)
    }
}

/// Map a non-2xx status to the matching error.
fn check_status(operation: Operation, status: http::StatusCode, body: &[u8]) -> ControllerResult<()> {
    if status.is_success() {
        return Ok(());
    }

    let mut message = String::from_utf8_lossy(body).trim().to_string();
    if message.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
    }

    debug!(%operation, %status, "provider returned non-2xx");

    Err(match status {
        http::StatusCode::UNAUTHORIZED | http::StatusCode::FORBIDDEN => {
            ControllerError::Unauthorized { operation, message }
        }
        http::StatusCode::TOO_MANY_REQUESTS => ControllerError::Throttled { operation },
        _ => ControllerError::Provider {
            operation,
            status: status.as_u16(),
            message,
        },
    })
}

impl InstanceController for HttpController {
    fn start<'a>(&'a self, instance: &'a InstanceRef) -> ControllerFuture<'a, ()> {
        Box::pin(async move {
            self.call(Operation::Start, instance).await?;
            Ok(())
        })
    }

    fn stop<'a>(&'a self, instance: &'a InstanceRef) -> ControllerFuture<'a, ()> {
        Box::pin(async move {
            self.call(Operation::Stop, instance).await?;
            Ok(())
        })
    }

    fn describe<'a>(&'a self, instance: &'a InstanceRef) -> ControllerFuture<'a, InstanceState> {
        Box::pin(async move {
            let bytes = self.call(Operation::Describe, instance).await?;
            let output: DescribeInstancesOutput =
                serde_json::from_slice(&bytes).map_err(|e| ControllerError::MalformedResponse {
                    operation: Operation::Describe,
                    message: e.to_string(),
                })?;
            let state = output.instance_state();
            debug!(%instance, %state, "described instance");
            Ok(state)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;

    #[derive(Debug, Default, Clone)]
    struct Seen {
        paths: Vec<String>,
        bodies: Vec<serde_json::Value>,
        auth: Vec<Option<String>>,
        region: Vec<Option<String>>,
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn recording_router(seen: Arc<Mutex<Seen>>, describe_body: &'static str) -> Router {
        let record = move |path: &'static str| {
            let seen = seen.clone();
            move |headers: HeaderMap, body: String| {
                let seen = seen.clone();
                async move {
                    let mut seen = seen.lock().unwrap();
                    seen.paths.push(path.to_string());
                    seen.bodies.push(serde_json::from_str(&body).unwrap());
                    seen.auth.push(
                        headers
                            .get("authorization")
                            .map(|v| v.to_str().unwrap().to_string()),
                    );
                    seen.region.push(
                        headers
                            .get("x-provider-region")
                            .map(|v| v.to_str().unwrap().to_string()),
                    );
                    if path == "DescribeInstances" { describe_body } else { "{}" }
                }
            }
        };
        Router::new()
            .route("/StartInstances", post(record("StartInstances")))
            .route("/StopInstances", post(record("StopInstances")))
            .route("/DescribeInstances", post(record("DescribeInstances")))
    }

    #[tokio::test]
    async fn describe_parses_running_state() {
        let seen = Arc::new(Mutex::new(Seen::default()));
        let url = serve(recording_router(
            seen.clone(),
            r#"{"Reservations":[{"Instances":[{"InstanceId":"i-1","State":{"Code":16,"Name":"running"}}]}]}"#,
        ))
        .await;

        let controller = HttpController::new(&url, Duration::from_secs(5)).unwrap();
        let state = controller.describe(&InstanceRef::new("i-1")).await.unwrap();
        assert_eq!(state, InstanceState::Running);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.paths, vec!["DescribeInstances"]);
        assert_eq!(seen.bodies[0], serde_json::json!({"InstanceIds": ["i-1"]}));
    }

    #[tokio::test]
    async fn describe_empty_reservations_is_unknown() {
        let seen = Arc::new(Mutex::new(Seen::default()));
        let url = serve(recording_router(seen, r#"{"Reservations":[]}"#)).await;

        let controller = HttpController::new(&url, Duration::from_secs(5)).unwrap();
        let state = controller.describe(&InstanceRef::new("i-1")).await.unwrap();
        assert_eq!(state, InstanceState::Unknown);
    }

    #[tokio::test]
    async fn start_and_stop_send_credentials_and_region() {
        let seen = Arc::new(Mutex::new(Seen::default()));
        let url = serve(recording_router(seen.clone(), "{}")).await;

        let controller = HttpController::new(&url, Duration::from_secs(5))
            .unwrap()
            .with_region(Some("us-east-1".to_string()))
            .with_token(Some("secret".to_string()));
        let id = InstanceRef::new("i-9");
        controller.start(&id).await.unwrap();
        controller.stop(&id).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.paths, vec!["StartInstances", "StopInstances"]);
        assert_eq!(seen.auth[0].as_deref(), Some("Bearer secret"));
        assert_eq!(seen.region[1].as_deref(), Some("us-east-1"));
    }

    #[tokio::test]
    async fn base_path_is_prefixed() {
        let seen = Arc::new(Mutex::new(Seen::default()));
        let router = Router::new().nest("/v1", recording_router(seen.clone(), "{}"));
        let url = serve(router).await;

        let controller = HttpController::new(&format!("{url}/v1/"), Duration::from_secs(5)).unwrap();
        controller.start(&InstanceRef::new("i-1")).await.unwrap();
        assert_eq!(seen.lock().unwrap().paths, vec!["StartInstances"]);
    }

    #[tokio::test]
    async fn forbidden_maps_to_unauthorized() {
        let router = Router::new().route(
            "/StartInstances",
            post(|| async { (StatusCode::FORBIDDEN, "access denied") }),
        );
        let url = serve(router).await;

        let controller = HttpController::new(&url, Duration::from_secs(5)).unwrap();
        let err = controller.start(&InstanceRef::new("i-1")).await.unwrap_err();
        assert!(matches!(err, ControllerError::Unauthorized { ref message, .. } if message == "access denied"));
    }

    #[tokio::test]
    async fn too_many_requests_maps_to_throttled() {
        let router = Router::new().route(
            "/StopInstances",
            post(|| async { StatusCode::TOO_MANY_REQUESTS }),
        );
        let url = serve(router).await;

        let controller = HttpController::new(&url, Duration::from_secs(5)).unwrap();
        let err = controller.stop(&InstanceRef::new("i-1")).await.unwrap_err();
        assert!(matches!(err, ControllerError::Throttled { operation: Operation::Stop }));
    }

    #[tokio::test]
    async fn server_error_maps_to_provider_error() {
        let router = Router::new().route(
            "/DescribeInstances",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let url = serve(router).await;

        let controller = HttpController::new(&url, Duration::from_secs(5)).unwrap();
        let err = controller.describe(&InstanceRef::new("i-1")).await.unwrap_err();
        assert!(matches!(err, ControllerError::Provider { status: 500, .. }));
    }

    #[tokio::test]
    async fn non_json_describe_is_malformed_not_unknown() {
        let router = Router::new().route("/DescribeInstances", post(|| async { "<xml/>" }));
        let url = serve(router).await;

        let controller = HttpController::new(&url, Duration::from_secs(5)).unwrap();
        let err = controller.describe(&InstanceRef::new("i-1")).await.unwrap_err();
        assert!(matches!(err, ControllerError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let router = Router::new().route(
            "/DescribeInstances",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "{}"
            }),
        );
        let url = serve(router).await;

        let controller = HttpController::new(&url, Duration::from_millis(100)).unwrap();
        let err = controller.describe(&InstanceRef::new("i-1")).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn refused_connection_is_connect_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let controller = HttpController::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();
        let err = controller.start(&InstanceRef::new("i-1")).await.unwrap_err();
        assert!(matches!(err, ControllerError::Connect { operation: Operation::Start, .. }));
    }

    #[test]
    fn rejects_non_http_endpoints() {
        assert!(matches!(
            HttpController::new("https://ec2.example.com", Duration::from_secs(1)),
            Err(ControllerError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            HttpController::new("not a url", Duration::from_secs(1)),
            Err(ControllerError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn default_port_is_80() {
        let controller = HttpController::new("http://control.local", Duration::from_secs(1)).unwrap();
        assert_eq!(controller.authority, "control.local:80");
        assert_eq!(controller.base_path, "");
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(1000);
        let err = check_status(Operation::Stop, http::StatusCode::BAD_GATEWAY, body.as_bytes()).unwrap_err();
        match err {
            ControllerError::Provider { message, status, .. } => {
                assert_eq!(status, 502);
                assert_eq!(message.len(), MAX_ERROR_BODY);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
