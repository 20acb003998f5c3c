use std::path::{Path, PathBuf};

use thiserror::Error;

/// Every failure a render can end with. Nothing is retried; the first error
/// aborts the current render and is handed back to the caller.
///
/// The enum is `Clone` so a helper's typed error can be pulled back out of a
/// template engine's error chain (see [`Error::recover`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Bad or missing config, env, data or helper file.
    #[error("config error in '{}': {message}", .path.display())]
    Config { path: PathBuf, message: String },

    /// A file or external value referenced from a template does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unsupported rendering engine: {0}")]
    UnsupportedEngine(String),

    /// The external process could not start or exited non-zero.
    #[error("command '{command}' failed: {stderr}")]
    ExternalCommand { command: String, stderr: String },

    /// A helper was called with arguments it cannot work with.
    #[error("helper '{name}': {message}")]
    Helper { name: String, message: String },

    #[error("template error: {0}")]
    Template(String),

    /// Source/output combination the command line cannot serve.
    #[error("{0}")]
    Usage(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config(path: impl AsRef<Path>, message: impl ToString) -> Error {
        Error::Config {
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }

    pub fn helper(name: &str, message: impl ToString) -> Error {
        Error::Helper {
            name: name.to_string(),
            message: message.to_string(),
        }
    }

    /// Walks the source chain of an engine error looking for a helper error
    /// raised by this crate; falls back to a `Template` error carrying the
    /// engine's own message.
    pub fn recover(err: &(dyn std::error::Error + 'static)) -> Error {
        let mut current = Some(err);
        while let Some(e) = current {
            if let Some(ours) = e.downcast_ref::<Error>() {
                return ours.clone();
            }
            current = e.source();
        }
        Error::Template(err.to_string())
    }
}
