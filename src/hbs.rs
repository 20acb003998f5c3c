use handlebars::{
    no_escape, Context, Handlebars, HelperDef, RenderContext as HbsRenderContext, RenderError,
    ScopedJson,
};
use serde_json::Value;

use crate::context::RenderContext;
use crate::error::{Error, Result};
use crate::helpers::{Helper, HelperRegistry};

struct Bound {
    name: String,
    helper: Helper,
}

impl HelperDef for Bound {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &handlebars::Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut HbsRenderContext<'reg, 'rc>,
    ) -> std::result::Result<ScopedJson<'reg, 'rc>, RenderError> {
        let args: Vec<Value> = h.params().iter().map(|p| p.value().clone()).collect();
        self.helper
            .call(&args)
            .map(ScopedJson::Derived)
            .map_err(|e| RenderError::from_error(&self.name, e))
    }
}

/// Builds the Handlebars registry for a single render. Handlebars keeps
/// helpers in the registry rather than in the data, so a new registry is made
/// every time and nothing bound for an earlier render (possibly for another
/// working directory) can leak into this one.
fn register_helpers(helpers: &HelperRegistry) -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(false);
    handlebars.register_escape_fn(no_escape);
    for (name, helper) in helpers.iter() {
        handlebars.register_helper(
            name,
            Box::new(Bound {
                name: name.to_string(),
                helper: helper.clone(),
            }),
        );
    }
    handlebars
}

pub fn render(template: &str, context: &RenderContext) -> Result<String> {
    let handlebars = register_helpers(&context.helpers);
    handlebars
        .render_template(template, &context.data())
        .map_err(|e| Error::recover(&e))
}
