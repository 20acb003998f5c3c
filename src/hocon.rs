use std::path::Path;

use hocon::{Hocon, HoconLoader};
use serde_json::{Number, Value};

use crate::error::{Error, Result};

pub fn read_hocon(file: &Path) -> Result<Value> {
    let hocon = HoconLoader::new()
        .load_file(&*file.to_string_lossy())
        .and_then(|loader| loader.hocon())
        .map_err(|e| Error::config(file, e))?;
    hocon_to_json(hocon).ok_or_else(|| Error::config(file, "failed to convert HOCON to JSON"))
}

fn hocon_to_json(hocon: Hocon) -> Option<Value> {
    match hocon {
        Hocon::Boolean(b) => Some(Value::Bool(b)),
        Hocon::Integer(i) => Some(Value::Number(Number::from(i))),
        Hocon::Real(f) => Some(Value::Number(
            Number::from_f64(f).unwrap_or_else(|| Number::from(0)),
        )),
        Hocon::String(s) => Some(Value::String(s)),
        Hocon::Array(vec) => Some(Value::Array(
            vec.into_iter().filter_map(hocon_to_json).collect(),
        )),
        Hocon::Hash(map) => Some(Value::Object(
            map.into_iter()
                .filter_map(|(k, v)| hocon_to_json(v).map(|v| (k, v)))
                .collect(),
        )),
        Hocon::Null => Some(Value::Null),
        Hocon::BadValue(_) => None,
    }
}
