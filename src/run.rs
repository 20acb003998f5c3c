use std::process::Command;

use log::debug;

use crate::error::{Error, Result};

/// Runs an external program and hands back its standard output.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &str, args: &[String]) -> Result<String>;
}

/// Spawns real processes, inheriting the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &str, args: &[String]) -> Result<String> {
        debug!("running {} {:?}", command, args);
        let output = Command::new(command)
            .args(args)
            .output()
            .map_err(|e| Error::ExternalCommand {
                command: command.to_string(),
                stderr: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(Error::ExternalCommand {
                command: command.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
