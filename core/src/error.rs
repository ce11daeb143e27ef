use thiserror::Error;

/// Errors surfaced by the remote analyzer client.
#[derive(Debug, Error)]
pub enum RemoteAnalysisError {
    /// No endpoint is configured; the client has nowhere to send requests.
    #[error("no endpoint configured")]
    MissingEndpoint,
    /// Network-level failure (connect, reset, timeout). Retried with backoff
    /// when transient, surfaced after retry exhaustion.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    /// The remote answered with a non-success HTTP status. Never retried.
    #[error("remote returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// The response body could not be interpreted.
    #[error("malformed remote payload: {0}")]
    Payload(String),
}

/// Local, user-input rejections. Each is a no-op on the buffer and maps to
/// a user-visible message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("no automatic fix; edit manually")]
    NoAutomaticFix,
    #[error("suggestion span no longer fits the current text")]
    InvalidSpan,
    #[error("nothing to apply")]
    NothingToApply,
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to rewrite")]
    NothingToRewrite,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_errors_carry_user_messages() {
        assert_eq!(
            EditError::NoAutomaticFix.to_string(),
            "no automatic fix; edit manually"
        );
        assert_eq!(EditError::NothingToUndo.to_string(), "nothing to undo");
    }

    #[test]
    fn status_error_includes_body() {
        let err = RemoteAnalysisError::Status {
            status: 401,
            body: "invalid proxy token".into(),
        };
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("invalid proxy token"));
    }
}
