use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::engine::Engine;
use crate::error::{Error, Result};

pub const CONFIG_FILE: &str = ".tmplrrc";

/// Options recognised on the command line and in the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Flags {
    pub data: Option<PathBuf>,
    pub render: Option<String>,
    pub env: Option<PathBuf>,
    pub helpers: Option<String>,
    pub config: Option<PathBuf>,
}

impl Flags {
    pub fn engine(&self) -> Result<Engine> {
        match self.render.as_deref() {
            Some(name) => name.parse(),
            None => Ok(Engine::default()),
        }
    }

    /// Fills every unset option from `other`.
    fn or(self, other: Flags) -> Flags {
        Flags {
            data: self.data.or(other.data),
            render: self.render.or(other.render),
            env: self.env.or(other.env),
            helpers: self.helpers.or(other.helpers),
            config: self.config.or(other.config),
        }
    }
}

/// Merges the config file under `flags`: options given explicitly win, the
/// file only supplies what is missing. The file is `flags.config` or
/// `.tmplrrc`, relative to `base_dir`; if it does not exist nothing is merged.
pub fn apply_config(flags: Flags, base_dir: &Path) -> Result<Flags> {
    let path = base_dir.join(flags.config.as_deref().unwrap_or(Path::new(CONFIG_FILE)));
    let mut merged = if path.is_file() {
        debug!("reading config file {:?}", path);
        flags.or(read_config(&path)?)
    } else {
        flags
    };
    if merged.render.is_none() {
        merged.render = Some(Engine::default().to_string());
    }
    Ok(merged)
}

fn read_config(path: &Path) -> Result<Flags> {
    let source = fs::read_to_string(path).map_err(|e| Error::config(path, e))?;
    if source.trim().is_empty() {
        return Ok(Flags::default());
    }
    serde_yaml::from_str::<Option<Flags>>(&source)
        .map(Option::unwrap_or_default)
        .map_err(|e| Error::config(path, e))
}
