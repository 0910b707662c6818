//! Mapping of `Bollard` connection failures onto `ContainerError`.

use std::error::Error as StdError;
use std::io;
use std::path::Path;

use crate::error::ContainerError;

/// Return the filesystem path of a `unix://` or `npipe://` endpoint.
pub(super) fn socket_path(endpoint: &str) -> Option<&Path> {
    endpoint
        .strip_prefix("unix://")
        .or_else(|| endpoint.strip_prefix("npipe://"))
        .map(Path::new)
}

/// Classify a connection error, preferring path-specific variants when the
/// endpoint names a socket on disk.
pub(super) fn classify_connection_error(
    error: &bollard::errors::Error,
    endpoint: &str,
) -> ContainerError {
    let path = socket_path(endpoint);
    let message = error.to_string();

    let kind = match error {
        bollard::errors::Error::SocketNotFoundError(_) => Some(io::ErrorKind::NotFound),
        bollard::errors::Error::IOError { err } => {
            first_io_kind(err).or_else(|| Some(err.kind()))
        }
        other => first_io_kind(other),
    };

    match (kind, path) {
        (Some(io::ErrorKind::NotFound), Some(socket)) => ContainerError::SocketNotFound {
            path: socket.to_path_buf(),
        },
        (Some(io::ErrorKind::PermissionDenied), Some(socket)) => {
            ContainerError::PermissionDenied {
                path: socket.to_path_buf(),
            }
        }
        _ => ContainerError::ConnectionFailed { message },
    }
}

/// Find the first `io::Error` in the source chain of `error`.
fn first_io_kind(error: &dyn StdError) -> Option<io::ErrorKind> {
    let mut current = error.source();
    while let Some(source) = current {
        if let Some(io_error) = source.downcast_ref::<io::Error>() {
            return Some(io_error.kind());
        }
        current = source.source();
    }
    None
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use rstest::rstest;

    use super::*;

    #[derive(Debug)]
    struct Wrapper {
        inner: io::Error,
    }

    impl fmt::Display for Wrapper {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "wrapped")
        }
    }

    impl StdError for Wrapper {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.inner)
        }
    }

    #[rstest]
    #[case("unix:///run/docker.sock", Some("/run/docker.sock"))]
    #[case("npipe:////./pipe/docker_engine", Some("//./pipe/docker_engine"))]
    #[case("http://localhost:2375", None)]
    fn socket_path_strips_socket_schemes(#[case] endpoint: &str, #[case] expected: Option<&str>) {
        assert_eq!(socket_path(endpoint), expected.map(Path::new));
    }

    #[rstest]
    fn first_io_kind_walks_the_source_chain() {
        let error = Wrapper {
            inner: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(first_io_kind(&error), Some(io::ErrorKind::PermissionDenied));
    }

    #[rstest]
    #[case(io::ErrorKind::NotFound, "container engine socket not found: /run/docker.sock")]
    #[case(
        io::ErrorKind::PermissionDenied,
        "permission denied accessing container socket: /run/docker.sock"
    )]
    fn io_errors_on_socket_paths_become_path_variants(
        #[case] kind: io::ErrorKind,
        #[case] expected: &str,
    ) {
        let error = bollard::errors::Error::IOError {
            err: io::Error::new(kind, "io"),
        };
        let classified = classify_connection_error(&error, "unix:///run/docker.sock");
        assert_eq!(classified.to_string(), expected);
    }

    #[rstest]
    fn io_errors_on_http_endpoints_stay_generic() {
        let error = bollard::errors::Error::IOError {
            err: io::Error::new(io::ErrorKind::NotFound, "io"),
        };
        let classified = classify_connection_error(&error, "http://localhost:2375");
        assert!(
            matches!(classified, ContainerError::ConnectionFailed { .. }),
            "expected ConnectionFailed, got {classified:?}"
        );
    }
}
