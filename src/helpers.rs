//! Helpers are the named callables a template can invoke.
//!
//! A [`Helper`] works on JSON values so the same function can be exposed to
//! both engines; the adapters in [`crate::jinja`] and [`crate::hbs`] translate
//! arguments and results at the boundary.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::Value;

use crate::aws::Aws;
use crate::error::{Error, Result};

type HelperFn = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

#[derive(Clone)]
pub struct Helper(Arc<HelperFn>);

impl Helper {
    pub fn new<F>(f: F) -> Helper
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Helper(Arc::new(f))
    }

    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.0)(args)
    }
}

impl fmt::Debug for Helper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Helper")
    }
}

/// Name-unique set of helpers for one render. Inserting a name that is
/// already present replaces the earlier binding.
#[derive(Debug, Clone, Default)]
pub struct HelperRegistry {
    helpers: BTreeMap<String, Helper>,
}

impl HelperRegistry {
    pub fn new() -> HelperRegistry {
        HelperRegistry::default()
    }

    /// The fixed catalog. `getFile` and `fileToBase64` resolve names against
    /// `working_dir`, which is captured now rather than at call time.
    pub fn builtin(working_dir: &Path, aws: Arc<Aws>) -> HelperRegistry {
        let mut registry = HelperRegistry::new();
        registry.insert("indent", Helper::new(indent));
        registry.insert("toYaml", Helper::new(to_yaml));
        registry.insert("quote", Helper::new(quote));
        registry.insert("trunc", Helper::new(trunc));
        registry.insert("toBase64", Helper::new(to_base64));

        let root = working_dir.to_path_buf();
        registry.insert(
            "getFile",
            Helper::new(move |args| read_file(&root, "getFile", args).map(Value::String)),
        );
        let root = working_dir.to_path_buf();
        registry.insert(
            "fileToBase64",
            Helper::new(move |args| {
                read_file(&root, "fileToBase64", args).map(|s| Value::String(BASE64.encode(s)))
            }),
        );

        let lookup = aws.clone();
        registry.insert(
            "lookupCfOutput",
            Helper::new(move |args| {
                let stack = str_arg("lookupCfOutput", args, 0)?;
                let key = str_arg("lookupCfOutput", args, 1)?;
                lookup.lookup_output(stack, key).map(Value::String)
            }),
        );
        registry.insert(
            "getParameter",
            Helper::new(move |args| {
                let name = str_arg("getParameter", args, 0)?;
                let query = match args.get(1) {
                    None | Some(Value::Null) => None,
                    Some(_) => Some(str_arg("getParameter", args, 1)?),
                };
                aws.get_parameter_value(name, query).map(Value::String)
            }),
        );
        registry.insert("valueOrDefault", Helper::new(value_or_default));
        registry
    }

    pub fn insert(&mut self, name: impl Into<String>, helper: Helper) -> Option<Helper> {
        self.helpers.insert(name.into(), helper)
    }

    pub fn get(&self, name: &str) -> Option<&Helper> {
        self.helpers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.helpers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.helpers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Helper)> {
        self.helpers.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Text of a value as a template would print it: strings verbatim, `null`
/// as nothing, everything else as JSON.
pub fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn arg<'a>(name: &str, args: &'a [Value], idx: usize) -> Result<&'a Value> {
    args.get(idx)
        .ok_or_else(|| Error::helper(name, format!("missing argument {}", idx + 1)))
}

fn str_arg<'a>(name: &str, args: &'a [Value], idx: usize) -> Result<&'a str> {
    arg(name, args, idx)?
        .as_str()
        .ok_or_else(|| Error::helper(name, format!("argument {} must be a string", idx + 1)))
}

fn count_arg(name: &str, args: &[Value], idx: usize) -> Result<usize> {
    arg(name, args, idx)?
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| {
            Error::helper(
                name,
                format!("argument {} must be a non-negative integer", idx + 1),
            )
        })
}

/// Widest indentation `indent` accepts.
pub const MAX_INDENT: usize = 1024;

/// Prefixes every line, blank ones included, with `count` spaces. Unlike some
/// `indent` helpers this does not leave whitespace-only lines untouched.
pub fn indent(args: &[Value]) -> Result<Value> {
    let text = str_arg("indent", args, 0)?;
    let count = count_arg("indent", args, 1)?;
    if count > MAX_INDENT {
        return Err(Error::helper(
            "indent",
            format!("indentation {} exceeds the limit of {}", count, MAX_INDENT),
        ));
    }
    let prefix = " ".repeat(count);
    let indented = text
        .split_inclusive('\n')
        .map(|line| format!("{}{}", prefix, line))
        .collect::<String>();
    Ok(Value::String(indented))
}

pub fn to_yaml(args: &[Value]) -> Result<Value> {
    let value = args.first().unwrap_or(&Value::Null);
    let yaml = serde_yaml::to_string(value).map_err(|e| Error::helper("toYaml", e))?;
    Ok(Value::String(yaml.trim().to_string()))
}

pub fn quote(args: &[Value]) -> Result<Value> {
    let text = match args.first().unwrap_or(&Value::Null) {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Ok(Value::String(format!("\"{}\"", text)))
}

pub fn trunc(args: &[Value]) -> Result<Value> {
    let text = str_arg("trunc", args, 0)?;
    let max = count_arg("trunc", args, 1)?;
    Ok(Value::String(text.chars().take(max).collect()))
}

pub fn to_base64(args: &[Value]) -> Result<Value> {
    let text = str_arg("toBase64", args, 0)?;
    Ok(Value::String(BASE64.encode(text.as_bytes())))
}

pub fn value_or_default(args: &[Value]) -> Result<Value> {
    match args.first() {
        Some(v) if !v.is_null() => Ok(v.clone()),
        _ => Ok(args.get(1).cloned().unwrap_or(Value::Null)),
    }
}

fn read_file(root: &Path, helper: &str, args: &[Value]) -> Result<String> {
    let path: PathBuf = root.join(str_arg(helper, args, 0)?);
    fs::read_to_string(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound(path.display().to_string()),
        _ => Error::helper(helper, format!("cannot read '{}': {}", path.display(), e)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::tests::FakeRunner;
    use serde_json::json;
    use tempfile::TempDir;

    fn call(f: fn(&[Value]) -> Result<Value>, args: Value) -> Value {
        f(args.as_array().unwrap()).unwrap()
    }

    #[test]
    fn indent_prefixes_every_line() {
        assert_eq!(call(indent, json!(["foo", 2])), json!("  foo"));
        assert_eq!(call(indent, json!(["a\n\nb\n", 3])), json!("   a\n   \n   b\n"));
        assert_eq!(call(indent, json!(["a\nb", 0])), json!("a\nb"));
        assert_eq!(call(indent, json!(["", 4])), json!(""));
    }

    #[test]
    fn indent_rejects_negative_count() {
        assert!(matches!(
            indent(&[json!("a"), json!(-1)]),
            Err(Error::Helper { .. })
        ));
    }

    #[test]
    fn indent_rejects_huge_count() {
        match indent(&[json!("a"), json!(u64::MAX)]) {
            Err(Error::Helper { name, .. }) => assert_eq!(name, "indent"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(indent(&[json!("a"), json!(MAX_INDENT + 1)]).is_err());
        assert_eq!(
            indent(&[json!("a"), json!(MAX_INDENT)]).unwrap(),
            json!(format!("{}a", " ".repeat(MAX_INDENT)))
        );
    }

    #[test]
    fn to_yaml_is_trimmed() {
        assert_eq!(
            call(to_yaml, json!([{"a": "a", "b": "b"}])),
            json!("a: a\nb: b")
        );
        assert_eq!(call(to_yaml, json!([[1, 2]])), json!("- 1\n- 2"));
    }

    #[test]
    fn quote_does_not_escape() {
        assert_eq!(call(quote, json!(["bar"])), json!("\"bar\""));
        assert_eq!(call(quote, json!(["a\"b"])), json!("\"a\"b\""));
        assert_eq!(call(quote, json!([42])), json!("\"42\""));
    }

    #[test]
    fn trunc_never_exceeds_limit() {
        assert_eq!(call(trunc, json!(["alongstring", 3])), json!("alo"));
        assert_eq!(call(trunc, json!(["foobar", 6])), json!("foobar"));
        assert_eq!(call(trunc, json!(["foo", 10])), json!("foo"));
        assert_eq!(call(trunc, json!(["żółw", 2])), json!("żó"));
    }

    #[test]
    fn to_base64_encodes_bytes() {
        assert_eq!(call(to_base64, json!(["bar"])), json!("YmFy"));
        assert_eq!(call(to_base64, json!([""])), json!(""));
    }

    #[test]
    fn value_or_default_only_replaces_null() {
        assert_eq!(call(value_or_default, json!([null, "d"])), json!("d"));
        assert_eq!(call(value_or_default, json!(["", "d"])), json!(""));
        assert_eq!(call(value_or_default, json!([0, "d"])), json!(0));
        assert_eq!(call(value_or_default, json!([false, "d"])), json!(false));
        assert_eq!(value_or_default(&[]).unwrap(), Value::Null);
    }

    #[test]
    fn file_helpers_read_relative_to_working_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("foo.txt"), "foo").unwrap();
        let aws = Arc::new(Aws::new(Arc::new(FakeRunner::default())));
        let registry = HelperRegistry::builtin(dir.path(), aws);

        let get_file = registry.get("getFile").unwrap();
        assert_eq!(get_file.call(&[json!("foo.txt")]).unwrap(), json!("foo"));
        let to_b64 = registry.get("fileToBase64").unwrap();
        assert_eq!(to_b64.call(&[json!("foo.txt")]).unwrap(), json!("Zm9v"));

        match get_file.call(&[json!("missing.txt")]) {
            Err(Error::NotFound(p)) => assert!(p.ends_with("missing.txt")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn builtin_catalog_is_complete() {
        let aws = Arc::new(Aws::new(Arc::new(FakeRunner::default())));
        let registry = HelperRegistry::builtin(Path::new("."), aws);
        for name in [
            "indent",
            "toYaml",
            "quote",
            "trunc",
            "toBase64",
            "getFile",
            "fileToBase64",
            "lookupCfOutput",
            "getParameter",
            "valueOrDefault",
        ] {
            assert!(registry.contains(name), "{} missing", name);
        }
        assert_eq!(registry.len(), 10);
    }

    #[test]
    fn registry_insert_replaces() {
        let mut registry = HelperRegistry::new();
        registry.insert("x", Helper::new(|_| Ok(json!(1))));
        let previous = registry.insert("x", Helper::new(|_| Ok(json!(2))));
        assert!(previous.is_some());
        assert_eq!(registry.get("x").unwrap().call(&[]).unwrap(), json!(2));
    }
}
