use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::{env, process};

use anyhow::{Context, Result};
use clap::Parser;
use log::debug;
use serde_json::Value;

use tmplr::batch::{self, Source};
use tmplr::config::apply_config;
use tmplr::values::{merge_values, read_values};
use tmplr::{Flags, Processor};

#[derive(Parser, Debug)]
#[clap(
    author = "Alexey Novakov",
    about = "Command line tool to render configuration files from Jinja or Handlebars templates.",
    version
)]
struct Opts {
    /// YAML (or HOCON .conf) file with substitution data
    #[clap(short, long)]
    data: Option<PathBuf>,
    /// Template engine: jinja or handlebars
    #[clap(short, long)]
    render: Option<String>,
    /// YAML file with environment variables
    #[clap(short, long)]
    env: Option<PathBuf>,
    /// Helper module file or directory; several may be joined like PATH
    #[clap(short = 'H', long)]
    helpers: Option<String>,
    /// Config file, defaults to .tmplrrc
    #[clap(short, long)]
    config: Option<PathBuf>,
    #[clap(long)]
    debug: bool,
    /// [SOURCE] [OUTPUT]; SOURCE '-' reads the template from stdin. With a
    /// template piped in, a single argument is the OUTPUT file
    #[clap(max_values = 2)]
    paths: Vec<PathBuf>,
}

impl Opts {
    fn flags(&self) -> Flags {
        Flags {
            data: self.data.clone(),
            render: self.render.clone(),
            env: self.env.clone(),
            helpers: self.helpers.clone(),
            config: self.config.clone(),
        }
    }
}

fn read_optional(path: Option<&Path>) -> Result<Value> {
    match path {
        Some(p) => read_values(p).with_context(|| format!("Failed to load '{}'", p.display())),
        None => Ok(Value::Null),
    }
}

fn run(opts: Opts) -> Result<()> {
    let cwd = env::current_dir().context("Failed to read current directory")?;
    let flags = apply_config(opts.flags(), &cwd)?;
    debug!("{:?}", flags);

    let values = merge_values(
        read_optional(flags.data.as_deref())?,
        read_optional(flags.env.as_deref())?,
    );
    let dash = opts.paths.first().map_or(false, |p| p.as_path() == Path::new("-"));
    let mut stdin_text = String::new();
    if dash || (opts.paths.len() < 2 && !io::stdin().is_terminal()) {
        io::stdin()
            .read_to_string(&mut stdin_text)
            .context("Failed to read template from std in")?;
    }
    // a closed or empty pipe carries no template
    let (source, target) = batch::plan(&opts.paths, !stdin_text.is_empty())?;
    let target = target.as_deref();
    batch::validate(&source, target)?;

    let to_stdout = |s: &str| {
        io::stdout()
            .write_all(s.as_bytes())
            .with_context(|| "Failed to write to std out")
    };
    let processor = Processor::new();

    match source {
        Source::Stdin => {
            let out = processor.process_template(&stdin_text, values, &flags, &cwd)?;
            match target {
                Some(t) => fs::write(t, out)
                    .with_context(|| format!("Failed to write '{}'", t.display()))?,
                None => to_stdout(&out)?,
            }
        }
        Source::Path(path) => {
            for file in batch::source_files(&path)? {
                debug!("rendering file: {:?}", file);
                let template = fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read template '{}'", file.display()))?;
                let out = processor
                    .process_template(&template, values.clone(), &flags, &file)
                    .with_context(|| format!("Failed to render template '{}'", file.display()))?;
                match target {
                    Some(t) => {
                        let dest = batch::output_path(&file, t);
                        fs::write(&dest, out)
                            .with_context(|| format!("Failed to write '{}'", dest.display()))?
                    }
                    None => to_stdout(&out)?,
                }
            }
        }
    }
    Ok(())
}

fn main() {
    let opts: Opts = Opts::parse();
    let default_filter = if opts.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = run(opts) {
        if env::var_os("DEBUG").is_some() {
            eprintln!("Error: {:?}", e);
        } else {
            eprintln!("Error: {:#}", e);
        }
        process::exit(1)
    }
}
