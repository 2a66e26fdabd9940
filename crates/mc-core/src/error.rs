use eyre::eyre;
use std::path::PathBuf;
use std::result;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },
    #[error("{}:{line}: cannot parse expression `{text}`", file.display())]
    UnparseableExpression {
        file: PathBuf,
        /// 1-based source line.
        line: u32,
        text: String,
    },
    #[error("{}:{line}: {message}", file.display())]
    ArityMismatch {
        file: PathBuf,
        /// 1-based source line.
        line: u32,
        message: String,
    },
    #[error(transparent)]
    Generic(#[from] eyre::Report),
}

pub type Result<T> = result::Result<T, Error>;

impl Error {
    /// Map an I/O failure for `path`, distinguishing the missing-file case the
    /// recursive traversals treat as a skippable leaf.
    pub fn from_io(err: std::io::Error, path: &std::path::Path) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Error::Generic(eyre!("{}: {}", path.display(), err))
        }
    }

    pub fn is_file_not_found(&self) -> bool {
        matches!(self, Error::FileNotFound { .. })
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Generic(eyre::Report::msg(s))
    }
}
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Generic(eyre::Report::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn io_errors_map_by_kind() {
        let missing = Error::from_io(
            std::io::Error::from(std::io::ErrorKind::NotFound),
            Path::new("a.m"),
        );
        assert!(missing.is_file_not_found());

        let denied = Error::from_io(
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            Path::new("a.m"),
        );
        assert!(matches!(denied, Error::Generic(_)));
        assert!(denied.to_string().contains("a.m"));
    }
}
