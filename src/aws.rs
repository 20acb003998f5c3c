use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::debug;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::run::CommandRunner;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StackOutput {
    output_key: String,
    #[serde(default)]
    output_value: Option<String>,
}

/// Thin wrapper over the `aws` command line. Stack outputs are fetched once
/// per stack and reused for the lifetime of the value.
pub struct Aws {
    runner: Arc<dyn CommandRunner>,
    outputs: Mutex<HashMap<String, Vec<StackOutput>>>,
}

impl Aws {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Aws {
        Aws {
            runner,
            outputs: Mutex::new(HashMap::new()),
        }
    }

    /// Value of output `key` on CloudFormation stack `stack_name`.
    pub fn lookup_output(&self, stack_name: &str, key: &str) -> Result<String> {
        self.stack_outputs(stack_name)?
            .into_iter()
            .find(|o| o.output_key == key)
            .and_then(|o| o.output_value)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "output for stack \"{}\" and key \"{}\"",
                    stack_name, key
                ))
            })
    }

    /// SSM parameter `name`; `query` defaults to `Parameter.Value`.
    pub fn get_parameter_value(&self, name: &str, query: Option<&str>) -> Result<String> {
        let args = [
            "ssm",
            "get-parameter",
            "--name",
            name,
            "--query",
            query.unwrap_or("Parameter.Value"),
            "--output",
            "text",
        ];
        let out = self.aws(&args)?;
        Ok(out.trim_end_matches(&['\r', '\n'][..]).to_string())
    }

    fn stack_outputs(&self, stack_name: &str) -> Result<Vec<StackOutput>> {
        if let Some(cached) = self.cache().get(stack_name) {
            return Ok(cached.clone());
        }
        debug!("fetching outputs of stack {}", stack_name);
        let raw = self.aws(&[
            "cloudformation",
            "describe-stacks",
            "--stack-name",
            stack_name,
            "--query",
            "Stacks[0].Outputs",
            "--output",
            "json",
        ])?;
        let outputs: Option<Vec<StackOutput>> =
            serde_json::from_str(&raw).map_err(|e| Error::ExternalCommand {
                command: "aws".to_string(),
                stderr: format!("failed to parse JSON output: {}", e),
            })?;
        let outputs = outputs.unwrap_or_default();
        self.cache()
            .insert(stack_name.to_string(), outputs.clone());
        Ok(outputs)
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<StackOutput>>> {
        self.outputs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn aws(&self, args: &[&str]) -> Result<String> {
        let args = args.iter().map(|a| a.to_string()).collect::<Vec<_>>();
        self.runner.run("aws", &args)
    }
}
