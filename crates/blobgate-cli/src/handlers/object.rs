//! Object read and write handlers

use crate::key::ObjectKey;
use crate::{ApiError, AppState};
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use blobgate_store::{CONTENT_TYPE_OCTET_STREAM, CONTENT_TYPE_TEXT};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info};

/// Content type returned by `/get`
const CONTENT_TYPE_JSON: &str = "application/json";

/// ANY /get/{object} - Fetch an object, echo it to stdout and return it as JSON
pub async fn get_object(
    State(state): State<Arc<AppState>>,
    key: ObjectKey,
) -> Result<Response, ApiError> {
    let data = fetch(&state, &key).await?;
    if let Err(e) = echo(&mut tokio::io::stdout(), &key, &data).await {
        debug!(key = %key, error = %e, "Failed to echo object to stdout");
    }
    Ok(ok_with_body(CONTENT_TYPE_JSON, data))
}

/// ANY /get-blob/{object} - Fetch an object as raw bytes
pub async fn get_blob(
    State(state): State<Arc<AppState>>,
    key: ObjectKey,
) -> Result<Response, ApiError> {
    let data = fetch(&state, &key).await?;
    Ok(ok_with_body(CONTENT_TYPE_OCTET_STREAM, data))
}

/// ANY /put/{object} - Store the request body as a text object
pub async fn put_object(
    State(state): State<Arc<AppState>>,
    key: ObjectKey,
    body: Body,
) -> Result<Response, ApiError> {
    store(&state, &key, body, CONTENT_TYPE_TEXT).await
}

/// ANY /put-blob/{object} - Store the request body as a binary object
pub async fn put_blob(
    State(state): State<Arc<AppState>>,
    key: ObjectKey,
    body: Body,
) -> Result<Response, ApiError> {
    store(&state, &key, body, CONTENT_TYPE_OCTET_STREAM).await
}

/// Fetch then read an object. Both failures surface as 404.
async fn fetch(state: &AppState, key: &ObjectKey) -> Result<Bytes, ApiError> {
    let not_found = || ApiError::NotFound { key: key.to_string() };

    let body = state.store.get_object(key.as_str()).await.map_err(|e| {
        error!(key = %key, error = %e, "Can't get object");
        not_found()
    })?;

    body.read_all().await.map_err(|e| {
        error!(key = %key, error = %e, "Can't read object");
        not_found()
    })
}

async fn store(
    state: &AppState,
    key: &ObjectKey,
    body: Body,
    content_type: &str,
) -> Result<Response, ApiError> {
    let data = read_body_lossy(body).await;

    match state.store.put_object(key.as_str(), data, content_type).await {
        Ok(n) => {
            info!(key = %key, n, "Put object");
            Ok((StatusCode::OK, format!("Put {key}. OK.")).into_response())
        }
        Err(e) => {
            error!(key = %key, error = %e, "Can't put object");
            Err(ApiError::PutFailed { key: key.to_string() })
        }
    }
}

/// Collect the request body, keeping whatever arrived before a read error
async fn read_body_lossy(body: Body) -> Bytes {
    let mut stream = body.into_data_stream();
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(chunk) => buf.extend_from_slice(&chunk),
            Err(_) => break,
        }
    }
    buf.freeze()
}

fn ok_with_body(content_type: &'static str, data: Bytes) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], data).into_response()
}

/// Write `key`, a newline, then the payload to `out`
async fn echo<W>(out: &mut W, key: &ObjectKey, data: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::with_capacity(key.as_str().len() + 1 + data.len());
    buf.extend_from_slice(key.as_str().as_bytes());
    buf.push(b'\n');
    buf.extend_from_slice(data);
    out.write_all(&buf).await?;
    out.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn test_read_body_lossy_keeps_prefix_on_error() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
            Err(std::io::Error::other("connection reset")),
            Ok(Bytes::from_static(b"never seen")),
        ];
        let body = Body::from_stream(stream::iter(chunks));

        let data = read_body_lossy(body).await;
        assert_eq!(data.as_ref(), b"hello world");
    }

    #[tokio::test]
    async fn test_echo_writes_key_then_payload() {
        let key = ObjectKey::parse("notes.txt").unwrap();
        let mut out = Vec::new();

        echo(&mut out, &key, b"{\"a\":1}").await.unwrap();
        assert_eq!(out, b"notes.txt\n{\"a\":1}");
    }

    #[tokio::test]
    async fn test_read_body_lossy_empty() {
        assert!(read_body_lossy(Body::empty()).await.is_empty());
    }
}
