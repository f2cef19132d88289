use std::future::Future;
use std::pin::Pin;

use crate::error::ReadError;
use crate::messages::{MessagesPage, PageMetadata};

/// Message reader backend.
///
/// Callers don't enumerate or know concrete implementations; a reader
/// is just this trait. Each call is stateless — implementations hold
/// no mutable cross-call state, so concurrent calls are safe.
pub trait MessageReader: Send + Sync {
    /// Read one page of messages belonging to `channel`, applying the
    /// filters in `page`, newest first. `total` counts every row
    /// matching the filter, independent of limit/offset.
    fn read_all(
        &self,
        channel: &str,
        page: &PageMetadata,
    ) -> Pin<Box<dyn Future<Output = Result<MessagesPage, ReadError>> + Send + '_>>;
}
