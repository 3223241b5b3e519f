//! Minimal HTTP client for the trigger endpoints.

use std::time::Duration;

use anyhow::{Context, bail};
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use tracing::debug;

/// Send a bodyless request to `url` and return the response text.
///
/// Non-2xx responses are errors carrying the response body.
pub async fn invoke(method: http::Method, url: &str, timeout: Duration) -> anyhow::Result<String> {
    match tokio::time::timeout(timeout, send(method, url)).await {
        Ok(result) => result,
        Err(_) => bail!("request to {url} timed out after {timeout:?}"),
    }
}

async fn send(method: http::Method, url: &str) -> anyhow::Result<String> {
    let uri: http::Uri = url.parse().with_context(|| format!("invalid url {url:?}"))?;
    if uri.scheme_str() != Some("http") {
        bail!("only http:// urls are supported, got {url:?}");
    }
    let authority = uri.authority().context("url has no host")?;
    let address = format!("{}:{}", authority.host(), authority.port_u16().unwrap_or(80));

    let stream = tokio::net::TcpStream::connect(&address)
        .await
        .with_context(|| format!("connecting to {address}"))?;
    let io = hyper_util::rt::TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let req = http::Request::builder()
        .method(method.clone())
        .uri(&uri)
        .header(http::header::HOST, authority.as_str())
        .header(http::header::USER_AGENT, "ondemandctl/0.1")
        .body(Empty::<Bytes>::new())?;

    debug!(%method, %url, "sending request");
    let resp = sender.send_request(req).await?;
    let status = resp.status();
    let body = resp.into_body().collect().await?.to_bytes();
    let text = String::from_utf8_lossy(&body).into_owned();

    if !status.is_success() {
        bail!("{method} {url} returned {status}: {text}");
    }
    Ok(text)
}
