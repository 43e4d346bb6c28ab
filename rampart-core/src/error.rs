use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for Rampart.
#[derive(Error, Debug)]
pub enum RampartError {
    #[error("Monitored log file not readable: {0}")]
    LogFileUnreadable(PathBuf),

    #[error("Failed to load report cache {path}: {source}")]
    CacheLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to persist report cache {path}: {source}")]
    CacheSave {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RampartError {
    /// True for errors that abort startup. Everything else is surfaced to the
    /// notification sink and survived.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RampartError::LogFileUnreadable(_) | RampartError::CacheLoad { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_errors_are_fatal() {
        assert!(RampartError::LogFileUnreadable("/var/log/ufw.log".into()).is_fatal());
        let load = RampartError::CacheLoad {
            path: "data/reported-ips.txt".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(load.is_fatal());
    }

    #[test]
    fn save_failure_is_not_fatal() {
        let save = RampartError::CacheSave {
            path: "data/reported-ips.txt".into(),
            source: std::io::Error::other("disk full"),
        };
        assert!(!save.is_fatal());
        assert!(save.to_string().contains("reported-ips.txt"));
    }
}
