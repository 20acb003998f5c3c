use std::path::Path;
use std::sync::Arc;

use log::debug;
use serde_json::Value;

use crate::aws::Aws;
use crate::config::Flags;
use crate::context::{build_context, resolve_working_dir};
use crate::custom::load_custom_helpers;
use crate::engine;
use crate::error::Result;
use crate::run::{CommandRunner, SystemRunner};

/// Entry point for rendering. Holds the collaborators that outlive a single
/// render: the command runner and the AWS output cache.
pub struct Processor {
    runner: Arc<dyn CommandRunner>,
    aws: Arc<Aws>,
}

impl Processor {
    pub fn new() -> Processor {
        Processor::with_runner(Arc::new(SystemRunner))
    }

    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Processor {
        Processor {
            aws: Arc::new(Aws::new(runner.clone())),
            runner,
        }
    }

    /// Renders one template. `working_dir` may name the template file itself,
    /// in which case its directory is used to resolve relative file names.
    pub fn process_template(
        &self,
        template: &str,
        values: Value,
        flags: &Flags,
        working_dir: &Path,
    ) -> Result<String> {
        let engine = flags.engine()?;
        let working_dir = resolve_working_dir(working_dir)?;
        debug!("working directory {:?}", working_dir);

        let mut context = build_context(values, flags, &working_dir, self.aws.clone())?;
        load_custom_helpers(
            &working_dir,
            &mut context.helpers,
            flags.helpers.as_deref(),
            self.runner.clone(),
        )?;
        engine::render(template, &context, engine)
    }
}

impl Default for Processor {
    fn default() -> Self {
        Processor::new()
    }
}
