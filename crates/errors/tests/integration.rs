//! Integration tests for error types

#[cfg(test)]
mod tests {
    use firstrun_errors::*;

    #[test]
    fn test_error_conversion() {
        let index_err = IndexError::RepositoryUnavailable {
            path: "/product/fdroid/repo".into(),
        };
        let err: Error = index_err.into();
        assert!(matches!(err, Error::Index(_)));
        assert_eq!(err.user_code(), Some("index.repository_unavailable"));
        assert!(err.user_hint().is_some());
    }

    #[test]
    fn test_error_display() {
        let err = InstallError::Truncated {
            path: "/repo/a.apk".into(),
            written: 10,
            expected: 20,
        };
        assert_eq!(
            err.to_string(),
            "archive /repo/a.apk truncated: wrote 10 of 20 bytes"
        );
    }

    #[test]
    fn test_io_class() {
        assert!(InstallError::EmptyArchive { path: "x".into() }.is_io_failure());
        assert!(!InstallError::NotAFile { path: "x".into() }.is_io_failure());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let storage_err = StorageError::from_io_with_path(&io_err, std::path::Path::new("/data/app"));
        assert!(matches!(
            storage_err,
            StorageError::PermissionDenied { ref path } if path == "/data/app"
        ));
        assert_eq!(storage_err.user_code(), Some("storage.permission_denied"));

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::io_with_path(&io_err, "/tmp/x");
        assert!(err.is_retryable());
        assert_eq!(err.user_code(), Some("error.io"));
        assert_eq!(err.user_message(), "/tmp/x: gone");
    }
}
