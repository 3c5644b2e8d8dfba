use anyhow::{anyhow, Context};
use serde_json::json;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Comment text cannot be empty")]
    EmptyComment,

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),

    #[error("Server unreachable: {0}")]
    Unreachable(String),
}

impl Error {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::PermissionDenied => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::EmptyComment => StatusCode::BAD_REQUEST,
            Error::NullByteInString(_) => StatusCode::BAD_REQUEST,
            Error::Unreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::Unknown(msg) => json!({
                "message": msg,
                "type": "unknown",
            }),
            Error::PermissionDenied => json!({
                "message": "permission denied",
                "type": "permission-denied",
            }),
            Error::NotFound(what) => json!({
                "message": what,
                "type": "not-found",
            }),
            Error::Conflict(what) => json!({
                "message": what,
                "type": "conflict",
            }),
            Error::EmptyComment => json!({
                "message": "Comment content cannot be empty",
                "type": "empty-comment",
            }),
            Error::NullByteInString(s) => json!({
                "message": "there was a null byte in argument string",
                "type": "null-byte",
                "string": s,
            }),
            Error::Unreachable(msg) => json!({
                "message": msg,
                "type": "unreachable",
            }),
        })
        .expect("serializing error contents")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let message = || {
            String::from(
                data.get("message")
                    .and_then(|msg| msg.as_str())
                    .unwrap_or(""),
            )
        };
        Ok(
            match data
                .get("type")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow!("error type is not a string"))?
            {
                "unknown" => Error::Unknown(message()),
                "permission-denied" => Error::PermissionDenied,
                "not-found" => Error::NotFound(message()),
                "conflict" => Error::Conflict(message()),
                "empty-comment" => Error::EmptyComment,
                "null-byte" => Error::NullByteInString(String::from(
                    data.get("string").and_then(|s| s.as_str()).ok_or_else(|| {
                        anyhow!("error is a null-byte-in-string without a string")
                    })?,
                )),
                "unreachable" => Error::Unreachable(message()),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }

    /// Recovers an error from a non-successful response. Typed bodies are
    /// parsed as-is, otherwise the status code and the plain `message` field
    /// the backend sends are used.
    pub fn from_response(status: http::StatusCode, body: &[u8]) -> Error {
        use http::StatusCode;
        if let Ok(err) = Error::parse(body) {
            return err;
        }
        let message = serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::PermissionDenied,
            StatusCode::NOT_FOUND => Error::NotFound(message),
            StatusCode::CONFLICT => Error::Conflict(message),
            StatusCode::BAD_REQUEST if message.to_lowercase().contains("empty") => {
                Error::EmptyComment
            }
            _ => Error::Unknown(format!("{status}: {message}")),
        }
    }
}
