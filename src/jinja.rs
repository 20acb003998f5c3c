use std::collections::BTreeMap;

use minijinja::syntax::SyntaxConfig;
use minijinja::value::Rest;
use minijinja::{AutoEscape, Environment, ErrorKind, UndefinedBehavior, Value};

use crate::context::RenderContext;
use crate::error::{Error, Result};
use crate::helpers::Helper;

fn environment() -> Result<Environment<'static>> {
    let syntax = SyntaxConfig::builder()
        .block_delimiters("<%", "%>")
        .variable_delimiters("<%=", "%>")
        .comment_delimiters("<%#", "%>")
        .build()
        .map_err(|e| Error::Template(e.to_string()))?;

    let mut env = Environment::new();
    env.set_syntax(syntax);
    env.set_keep_trailing_newline(true);
    env.set_undefined_behavior(UndefinedBehavior::Lenient);
    env.set_auto_escape_callback(|_| AutoEscape::None);
    // undefined and none print as nothing
    env.set_formatter(|out, state, value| {
        if value.is_undefined() || value.is_none() {
            Ok(())
        } else {
            minijinja::escape_formatter(out, state, value)
        }
    });
    Ok(env)
}

fn function(name: &str, helper: Helper) -> Value {
    let name = name.to_string();
    Value::from_function(move |args: Rest<Value>| -> std::result::Result<Value, minijinja::Error> {
        let args = args
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| {
                minijinja::Error::new(
                    ErrorKind::InvalidOperation,
                    format!("helper '{}': {}", name, e),
                )
            })?;
        helper
            .call(&args)
            .map(|v| Value::from_serialize(&v))
            .map_err(|e| {
                minijinja::Error::new(ErrorKind::InvalidOperation, e.to_string()).with_source(e)
            })
    })
}

/// Helpers are bound as top-level context entries next to `values` and
/// `env`, so templates call them as `<%= toBase64(values.bar) %>`.
pub fn render(template: &str, context: &RenderContext) -> Result<String> {
    let env = environment()?;

    let mut scope: BTreeMap<String, Value> = context
        .helpers
        .iter()
        .map(|(name, helper)| (name.to_string(), function(name, helper.clone())))
        .collect();
    scope.insert("values".into(), Value::from_serialize(&context.values));
    scope.insert("env".into(), Value::from_serialize(&context.env));

    env.render_str(template, &scope)
        .map_err(|e| Error::recover(&e))
}
