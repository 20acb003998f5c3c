use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use serde_json::{json, Map, Value};
use serde_yaml::Value as Yaml;

use crate::aws::Aws;
use crate::config::Flags;
use crate::error::{Error, Result};
use crate::helpers::HelperRegistry;

/// Everything a template sees during one render. Built fresh per render and
/// dropped afterwards.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub values: Value,
    pub env: BTreeMap<String, String>,
    pub helpers: HelperRegistry,
}

impl RenderContext {
    /// The data half of the context, `{values, env}`, as the engines bind it.
    pub fn data(&self) -> Value {
        json!({
            "values": self.values,
            "env": self.env,
        })
    }
}

/// A file resolves to its parent directory; anything else is taken as-is.
/// Relative paths are anchored at the process working directory.
pub fn resolve_working_dir(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = env::current_dir().map_err(|e| Error::config(path, e))?;
        if path.as_os_str().is_empty() {
            cwd
        } else {
            cwd.join(path)
        }
    };
    if absolute.is_file() {
        if let Some(parent) = absolute.parent() {
            return Ok(parent.to_path_buf());
        }
    }
    Ok(absolute)
}

/// Reads a YAML env file. Values must be scalars; they are kept as strings.
pub fn read_env_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let source = fs::read_to_string(path).map_err(|e| Error::config(path, e))?;
    if source.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let parsed: Option<BTreeMap<String, Yaml>> =
        serde_yaml::from_str(&source).map_err(|e| Error::config(path, e))?;

    let mut vars = BTreeMap::new();
    for (key, value) in parsed.unwrap_or_default() {
        let text = match value {
            Yaml::Null => String::new(),
            Yaml::Bool(b) => b.to_string(),
            Yaml::Number(n) => n.to_string(),
            Yaml::String(s) => s,
            _ => {
                return Err(Error::config(
                    path,
                    format!("value of '{}' must be a scalar", key),
                ))
            }
        };
        vars.insert(key, text);
    }
    Ok(vars)
}

/// Assembles values, environment and the built-in helpers for one render.
/// `working_dir` must already be resolved; the file helpers capture it.
pub fn build_context(
    values: Value,
    flags: &Flags,
    working_dir: &Path,
    aws: Arc<Aws>,
) -> Result<RenderContext> {
    let values = match values {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };

    let mut vars: BTreeMap<String, String> = env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect();
    if let Some(env_file) = flags.env.as_deref().filter(|p| !p.as_os_str().is_empty()) {
        let overlay = read_env_file(env_file)?;
        debug!("env file {:?} sets {} variables", env_file, overlay.len());
        vars.extend(overlay);
    }

    Ok(RenderContext {
        values,
        env: vars,
        helpers: HelperRegistry::builtin(working_dir, aws),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::tests::FakeRunner;
    use tempfile::TempDir;

    fn aws() -> Arc<Aws> {
        Arc::new(Aws::new(Arc::new(FakeRunner::default())))
    }

    #[test]
    fn file_resolves_to_parent() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("t.yaml");
        fs::write(&file, "").unwrap();
        assert_eq!(resolve_working_dir(&file).unwrap(), dir.path());
        assert_eq!(resolve_working_dir(dir.path()).unwrap(), dir.path());
    }

    #[test]
    fn empty_path_is_process_cwd() {
        assert_eq!(
            resolve_working_dir(Path::new("")).unwrap(),
            env::current_dir().unwrap()
        );
    }

    #[test]
    fn env_file_overrides_process_env() {
        env::set_var("TMPLR_CONTEXT_TEST", "from-process");
        let dir = TempDir::new().unwrap();
        let env_file = dir.path().join("env.yml");
        fs::write(&env_file, "TMPLR_CONTEXT_TEST: from-file\nPORT: 8080\n").unwrap();

        let flags = Flags {
            env: Some(env_file),
            ..Flags::default()
        };
        let ctx = build_context(Value::Null, &flags, dir.path(), aws()).unwrap();
        assert_eq!(ctx.env["TMPLR_CONTEXT_TEST"], "from-file");
        assert_eq!(ctx.env["PORT"], "8080");
        assert_eq!(ctx.values, json!({}));
        assert!(ctx.helpers.contains("getFile"));
    }

    #[test]
    fn missing_env_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.yml");
        let flags = Flags {
            env: Some(missing.clone()),
            ..Flags::default()
        };
        match build_context(Value::Null, &flags, dir.path(), aws()) {
            Err(Error::Config { path, .. }) => assert_eq!(path, missing),
            other => panic!("unexpected {:?}", other.map(|c| c.values)),
        }
    }

    #[test]
    fn nested_env_value_is_rejected() {
        let dir = TempDir::new().unwrap();
        let env_file = dir.path().join("env.yml");
        fs::write(&env_file, "NESTED:\n  a: 1\n").unwrap();
        assert!(matches!(
            read_env_file(&env_file),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn empty_env_file_adds_nothing() {
        let dir = TempDir::new().unwrap();
        let env_file = dir.path().join("env.yml");
        fs::write(&env_file, "").unwrap();
        assert!(read_env_file(&env_file).unwrap().is_empty());
    }
}
