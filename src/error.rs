use thiserror::Error;

/// Failure kinds raised by the sort.
///
/// Errors are returned wrapped in [anyhow::Error] with context describing the file and position
/// involved. Use `error.downcast_ref::<SortError>()` to recover the kind. I/O failures are carried
/// as [std::io::Error] and can be recovered the same way.
#[derive(Debug, Error)]
pub enum SortError {
    /// The sort was configured with values it cannot work with, for example a zero chunk size or
    /// a destination directory that does not exist.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// A line does not match the `<integer>. <text>` format.
    #[error("malformed line: {line:?}, error: {reason}")]
    MalformedLine {
        line: String,
        reason: String,
    },
    /// Cancellation was requested through a [crate::cancellation::CancellationToken].
    #[error("sort cancelled")]
    Cancelled,
}
