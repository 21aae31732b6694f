//! Object key extraction from the request path

use axum::{
    extract::{FromRequestParts, Path},
    http::{request::Parts, StatusCode},
};

/// A validated object key: one path segment of ASCII letters, digits, `.`, `-`
/// or `_`, not made of dots alone.
///
/// Requests whose key does not match are answered with `404 Not Found`
/// before any handler logic runs, as if no route had matched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Validate a raw key
    pub fn parse(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        is_valid_key(&raw).then_some(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether `key` is a non-empty run of `[A-Za-z0-9._-]` other than a dot
/// segment such as `.` or `..`
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_'))
        && key.bytes().any(|b| b != b'.')
}

impl<S> FromRequestParts<S> for ObjectKey
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| StatusCode::NOT_FOUND)?;

        ObjectKey::parse(raw).ok_or(StatusCode::NOT_FOUND)
    }
}
