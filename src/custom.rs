//! User supplied helpers.
//!
//! A helper module is a YAML file whose top-level mapping is an export table:
//! each exported name maps to a factory description. At render time every
//! factory is handed an [`Invocation`] and returns the [`Helper`] that gets
//! bound under the exported name, replacing any helper of the same name.
//!
//! ```yaml
//! double:
//!   params: [x]
//!   expr: "x * 2"
//! gitSha:
//!   command: git
//!   args: [rev-parse, --short, HEAD]
//! ```

use std::collections::{BTreeMap, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, trace};
use minijinja::Environment;
use serde::Deserialize;
use serde_json::Value;

use crate::entries::{has_extension, resolve_entries};
use crate::error::{Error, Result};
use crate::helpers::{display, Helper, HelperRegistry};
use crate::run::CommandRunner;

pub const HELPERS_ENV: &str = "TMPLR_HELPERS";
pub const DEFAULT_HELPERS_PATH: &str = "tmplr_helpers";

const MODULE_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// What a factory gets to work with when it builds its helper.
#[derive(Clone)]
pub struct Invocation {
    pub working_directory: PathBuf,
    pub runner: Arc<dyn CommandRunner>,
}

pub trait HelperFactory: Send + Sync {
    fn create(&self, invocation: &Invocation) -> Result<Helper>;
}

/// An ordered export table of factories, usually read from a module file.
pub struct HelperModule {
    path: PathBuf,
    exports: Vec<(String, Box<dyn HelperFactory>)>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExportSpec {
    Expression {
        #[serde(default)]
        params: Vec<String>,
        expr: String,
    },
    Command {
        command: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl HelperModule {
    pub fn new(path: impl Into<PathBuf>) -> HelperModule {
        HelperModule {
            path: path.into(),
            exports: Vec::new(),
        }
    }

    pub fn with_export(
        mut self,
        name: impl Into<String>,
        factory: impl HelperFactory + 'static,
    ) -> HelperModule {
        self.exports.push((name.into(), Box::new(factory)));
        self
    }

    pub fn load(path: &Path) -> Result<HelperModule> {
        if !path.is_file() {
            return Err(Error::config(path, "helpers file not found"));
        }
        let source = fs::read_to_string(path).map_err(|e| Error::config(path, e))?;
        let specs: BTreeMap<String, ExportSpec> = if source.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_yaml::from_str::<Option<BTreeMap<String, ExportSpec>>>(&source)
                .map_err(|e| Error::config(path, e))?
                .unwrap_or_default()
        };

        let mut module = HelperModule::new(path);
        for (name, spec) in specs {
            module = match spec {
                ExportSpec::Expression { params, expr } => {
                    let factory = ExpressionFactory::new(&name, params, expr)
                        .map_err(|e| Error::config(path, e))?;
                    module.with_export(name, factory)
                }
                ExportSpec::Command { command, args } => {
                    module.with_export(name, CommandFactory { command, args })
                }
            };
        }
        Ok(module)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exports(&self) -> impl Iterator<Item = &str> {
        self.exports.iter().map(|(name, _)| name.as_str())
    }

    /// Runs every factory once and binds the results into `registry`.
    pub fn bind(&self, invocation: &Invocation, registry: &mut HelperRegistry) -> Result<()> {
        for (name, factory) in &self.exports {
            let helper = factory.create(invocation)?;
            if registry.insert(name.as_str(), helper).is_some() {
                trace!("helper '{}' from {:?} replaces an earlier one", name, self.path);
            } else {
                trace!("helper '{}' bound from {:?}", name, self.path);
            }
        }
        Ok(())
    }
}

/// Helper whose body is a MiniJinja expression over its named parameters.
/// The working directory is visible to the expression as `wd`.
pub struct ExpressionFactory {
    name: String,
    params: Vec<String>,
    expr: String,
    env: Arc<Environment<'static>>,
}

impl ExpressionFactory {
    pub fn new(name: &str, params: Vec<String>, expr: String) -> Result<ExpressionFactory> {
        let env = Environment::new();
        env.compile_expression(&expr)
            .map_err(|e| Error::helper(name, e))?;
        Ok(ExpressionFactory {
            name: name.to_string(),
            params,
            expr,
            env: Arc::new(env),
        })
    }
}

impl HelperFactory for ExpressionFactory {
    fn create(&self, invocation: &Invocation) -> Result<Helper> {
        let name = self.name.clone();
        let params = self.params.clone();
        let expr = self.expr.clone();
        let env = self.env.clone();
        let wd = invocation.working_directory.display().to_string();
        Ok(Helper::new(move |args| {
            let mut scope = BTreeMap::new();
            scope.insert("wd".to_string(), minijinja::Value::from(wd.as_str()));
            for (i, param) in params.iter().enumerate() {
                let arg = args.get(i).unwrap_or(&Value::Null);
                scope.insert(param.clone(), minijinja::Value::from_serialize(arg));
            }
            // a compiled expression borrows its source, so only the parse
            // check in `new` is kept and the text is compiled per call
            let result = env
                .compile_expression(&expr)
                .and_then(|e| e.eval(&scope))
                .map_err(|e| Error::helper(&name, e))?;
            serde_json::to_value(&result).map_err(|e| Error::helper(&name, e))
        }))
    }
}

/// Helper that runs an external command; call arguments are appended to the
/// configured ones and the output is returned without its trailing newline.
pub struct CommandFactory {
    pub command: String,
    pub args: Vec<String>,
}

impl HelperFactory for CommandFactory {
    fn create(&self, invocation: &Invocation) -> Result<Helper> {
        let runner = invocation.runner.clone();
        let command = self.command.clone();
        let fixed = self.args.clone();
        Ok(Helper::new(move |args| {
            let mut all = fixed.clone();
            all.extend(args.iter().map(display));
            let out = runner.run(&command, &all)?;
            Ok(Value::String(
                out.trim_end_matches(&['\r', '\n'][..]).to_string(),
            ))
        }))
    }
}

/// Picks the helper search path: the flag wins over the environment variable,
/// which wins over the default location.
pub fn helper_search_path(flag: Option<&str>, env_value: Option<String>) -> String {
    match (flag, env_value) {
        (Some(f), _) => f.to_string(),
        (None, Some(e)) => e,
        (None, None) => DEFAULT_HELPERS_PATH.to_string(),
    }
}

/// Module files named by a path list, in list order, each location once.
pub fn discover(search_path: &str) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();
    for location in env::split_paths(search_path) {
        if location.as_os_str().is_empty() || !seen.insert(location.clone()) {
            continue;
        }
        for file in resolve_entries(&location, |p| has_extension(p, MODULE_EXTENSIONS))? {
            if !files.contains(&file) {
                files.push(file);
            }
        }
    }
    Ok(files)
}

/// Loads every helper module on the search path and binds its exports into
/// `registry`. A missing default location is not an error.
pub fn load_custom_helpers(
    working_dir: &Path,
    registry: &mut HelperRegistry,
    helpers_flag: Option<&str>,
    runner: Arc<dyn CommandRunner>,
) -> Result<()> {
    let from_env = env::var(HELPERS_ENV).ok().filter(|v| !v.is_empty());
    let search_path = helper_search_path(helpers_flag, from_env);
    if search_path.is_empty() {
        return Ok(());
    }
    if search_path == DEFAULT_HELPERS_PATH && !Path::new(DEFAULT_HELPERS_PATH).exists() {
        return Ok(());
    }
    debug!("loading custom helpers from {}", search_path);

    let invocation = Invocation {
        working_directory: working_dir.to_path_buf(),
        runner,
    };
    for file in discover(&search_path)? {
        let module = HelperModule::load(&file)?;
        debug!(
            "helper module {:?} exports {:?}",
            module.path(),
            module.exports().collect::<Vec<_>>()
        );
        module.bind(&invocation, registry)?;
    }
    Ok(())
}
