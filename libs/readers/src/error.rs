type Cause = Box<dyn std::error::Error + Send + Sync>;

/// Error returned by every `MessageReader` operation.
///
/// Query, decode and count failures all render under the stable
/// "failed to read messages" prefix while preserving the underlying
/// cause for diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// Format selector is not in the allow-list of known tables.
    /// Rejected before any SQL is built.
    #[error("invalid message format '{0}'")]
    InvalidFormat(String),

    #[error("failed to read messages: query: {source}")]
    Query { source: Cause },

    #[error("failed to read messages: row decode: {source}")]
    Decode { source: Cause },

    #[error("failed to read messages: count: {source}")]
    Count { source: Cause },
}

impl ReadError {
    pub fn query(source: impl Into<Cause>) -> Self {
        Self::Query { source: source.into() }
    }

    pub fn decode(source: impl Into<Cause>) -> Self {
        Self::Decode { source: source.into() }
    }

    pub fn count(source: impl Into<Cause>) -> Self {
        Self::Count { source: source.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_failures_share_stable_prefix() {
        for err in [
            ReadError::query("connection refused"),
            ReadError::decode("bad column"),
            ReadError::count("scan failed"),
        ] {
            assert!(err.to_string().starts_with("failed to read messages: "));
        }
    }

    #[test]
    fn invalid_format_names_the_offender() {
        let err = ReadError::InvalidFormat("messages; DROP TABLE".into());
        assert_eq!(
            err.to_string(),
            "invalid message format 'messages; DROP TABLE'"
        );
    }
}
