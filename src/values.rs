use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::entries::has_extension;
use crate::error::{Error, Result};
use crate::hocon::read_hocon;

/// Loads a data file. `.conf`/`.hocon` files are HOCON, anything else YAML.
pub fn read_values(path: &Path) -> Result<Value> {
    if !path.is_file() {
        return Err(Error::config(path, "data file not found"));
    }
    if has_extension(path, &["conf", "hocon"]) {
        return read_hocon(path);
    }
    let source = fs::read_to_string(path).map_err(|e| Error::config(path, e))?;
    if source.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str(&source).map_err(|e| Error::config(path, e))
}

/// Shallow merge of two mappings, keys of `overlay` winning. Non-mapping
/// inputs contribute nothing.
pub fn merge_values(base: Value, overlay: Value) -> Value {
    let mut merged = match base {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    if let Value::Object(map) = overlay {
        merged.extend(map);
    }
    Value::Object(merged)
}
