//! Render configuration files from templates.
//!
//! A template is rendered against `values` (caller data), `env` (process
//! environment, optionally overlaid by an env file) and a set of helpers,
//! using either MiniJinja with `<%= %>` tags or Handlebars. See
//! [`Processor::process_template`].

pub mod aws;
pub mod batch;
pub mod config;
pub mod context;
pub mod custom;
pub mod engine;
pub mod entries;
pub mod error;
pub mod hbs;
mod hocon;
pub mod helpers;
pub mod jinja;
pub mod process;
pub mod run;
pub mod values;

pub use config::Flags;
pub use context::RenderContext;
pub use engine::Engine;
pub use error::{Error, Result};
pub use helpers::{Helper, HelperRegistry};
pub use process::Processor;
