//! Watch setup error types.

/// Errors that can occur while setting up a filesystem watch.
#[derive(thiserror::Error, Debug)]
pub enum WatchError {
    /// Notify watcher error.
    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_notify_error() {
        let err: WatchError = notify::Error::generic("test error").into();
        assert!(matches!(err, WatchError::Notify(_)));
        assert!(err.to_string().contains("File watcher error"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: WatchError = io_err.into();
        assert!(matches!(err, WatchError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }
}
