use serde::de::DeserializeOwned;
use serde_json::json;

use crate::ipc::error::err;
use crate::ipc::types::Request;

/// Handlers bail out with a ready-made error response.
pub type ParamResult<T> = Result<T, serde_json::Value>;

pub fn required_str<'a>(req: &'a Request, key: &str) -> ParamResult<&'a str> {
    match req.params.get(key).and_then(|v| v.as_str()) {
        Some(v) => Ok(v),
        None => Err(err(&req.id, "bad_params", format!("missing {key}"), None)),
    }
}

pub fn optional_str<'a>(req: &'a Request, key: &str) -> ParamResult<Option<&'a str>> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => match v.as_str() {
            Some(s) => Ok(Some(s)),
            None => Err(err(
                &req.id,
                "bad_params",
                format!("{key} must be a string"),
                None,
            )),
        },
    }
}

/// Integer or integer string; null and absent are both `None`.
pub fn optional_i64(req: &Request, key: &str) -> ParamResult<Option<i64>> {
    let v = match req.params.get(key) {
        None => return Ok(None),
        Some(v) if v.is_null() => return Ok(None),
        Some(v) => v,
    };
    let n = match v {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match n {
        Some(n) => Ok(Some(n)),
        None => Err(err(
            &req.id,
            "bad_params",
            format!("{key} must be an integer"),
            None,
        )),
    }
}

pub fn required_i64(req: &Request, key: &str) -> ParamResult<i64> {
    match optional_i64(req, key)? {
        Some(n) => Ok(n),
        None => Err(err(&req.id, "bad_params", format!("missing {key}"), None)),
    }
}

pub fn required_array<'a>(req: &'a Request, key: &str) -> ParamResult<&'a Vec<serde_json::Value>> {
    match req.params.get(key) {
        Some(v) => match v.as_array() {
            Some(items) => Ok(items),
            None => Err(err(
                &req.id,
                "bad_params",
                format!("{key} must be an array"),
                None,
            )),
        },
        None => Err(err(&req.id, "bad_params", format!("missing {key}"), None)),
    }
}

/// Deserializes every element of `params[key]`, reporting the first bad index.
pub fn parse_list<T: DeserializeOwned>(req: &Request, key: &str) -> ParamResult<Vec<T>> {
    let items = required_array(req, key)?;
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match serde_json::from_value::<T>(item.clone()) {
            Ok(v) => out.push(v),
            Err(e) => {
                return Err(err(
                    &req.id,
                    "bad_params",
                    format!("{key}[{i}]: {e}"),
                    Some(json!({ "field": key, "index": i })),
                ))
            }
        }
    }
    Ok(out)
}

pub fn parse_object<T: DeserializeOwned>(req: &Request, key: &str) -> ParamResult<T> {
    let Some(raw) = req.params.get(key) else {
        return Err(err(&req.id, "bad_params", format!("missing {key}"), None));
    };
    serde_json::from_value::<T>(raw.clone())
        .map_err(|e| err(&req.id, "bad_params", format!("{key}: {e}"), None))
}
