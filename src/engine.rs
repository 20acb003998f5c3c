use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::context::RenderContext;
use crate::error::{Error, Result};
use crate::{hbs, jinja};

/// Template syntax used for a render. Fixed for the whole render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Engine {
    /// MiniJinja with `<%= %>` / `<% %>` tags; helpers live in the context.
    #[default]
    Jinja,
    /// Handlebars; helpers are registered by name before rendering.
    Handlebars,
}

impl FromStr for Engine {
    type Err = Error;

    fn from_str(s: &str) -> Result<Engine> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jinja" | "minijinja" | "ejs" => Ok(Engine::Jinja),
            "handlebars" | "hbs" => Ok(Engine::Handlebars),
            _ => Err(Error::UnsupportedEngine(s.to_string())),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Engine::Jinja => f.write_str("jinja"),
            Engine::Handlebars => f.write_str("handlebars"),
        }
    }
}

/// Renders `template` against `context`. Both engines see the same `values`,
/// `env` and helpers; only the way they are bound differs.
pub fn render(template: &str, context: &RenderContext, engine: Engine) -> Result<String> {
    debug!(
        "rendering with {} ({} helpers)",
        engine,
        context.helpers.len()
    );
    match engine {
        Engine::Jinja => jinja::render(template, context),
        Engine::Handlebars => hbs::render(template, context),
    }
}
