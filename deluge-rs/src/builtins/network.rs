//! `getUrl`, `postUrl` and `_invokeurl`.
//!
//! These never fail on transport problems.  In simple mode the result is
//! the response body (or `""` on failure); in verbose mode it is a map with
//! `status_code`, `text` and `headers` (or `{"error": message}`).  Argument
//! errors of `getUrl` and `postUrl` are reported as [`RuntimeError`]s;
//! `_invokeurl` answers malformed parameter maps with `""` as well.

use tracing::warn;

use super::{check_arity, str_arg, BuiltinTable};
use crate::error::{RuntimeError, RuntimeResult};
use crate::http::{HttpClient, HttpError, Request, Response};
use crate::runtime::{Map, Value};

pub const UNSUPPORTED_METHOD: &str = "Unsupported HTTP method";

pub(super) fn register(t: &mut BuiltinTable, client: HttpClient) {
    let c = client.clone();
    t.register("getUrl", move |args| get_url(&c, args));
    let c = client.clone();
    t.register("postUrl", move |args| post_url(&c, args));
    t.register("_invokeurl", move |args| invoke_url(&client, args));
}

fn bool_arg(args: &[Value], i: usize, default: bool) -> bool {
    match args.get(i) {
        None | Some(Value::Null) => default,
        Some(v) => v.as_bool(),
    }
}

/// Optional map argument; null and absent are empty.
fn map_arg(args: &[Value], i: usize, name: &str) -> RuntimeResult<Map> {
    match args.get(i) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Map(m)) => Ok(m.borrow().clone()),
        Some(other) => Err(RuntimeError::mismatch(format!(
            "{name}: argument {} must be a map, got {}",
            i + 1,
            other.type_name()
        ))),
    }
}

fn with_headers(mut req: Request, headers: &Map) -> Request {
    for (k, v) in headers.iter() {
        req = req.header(k.as_str(), v.to_string());
    }
    req
}

fn respond(url: &str, result: Result<Response, HttpError>, simple: bool) -> Value {
    match result {
        Ok(resp) if simple => Value::from(resp.text()),
        Ok(resp) => {
            let mut headers = Map::new();
            for (k, v) in &resp.headers {
                headers.put(k.as_str(), v.as_str());
            }
            let mut m = Map::new();
            m.put("status_code", i64::from(resp.status));
            m.put("text", resp.text());
            m.put("headers", headers);
            Value::map(m)
        }
        Err(e) => {
            warn!(url, error = %e, "network call failed");
            if simple {
                Value::from("")
            } else {
                let mut m = Map::new();
                m.put("error", e.to_string());
                Value::map(m)
            }
        }
    }
}

/// `getUrl(url[, simple[, headers]])`
fn get_url(client: &HttpClient, args: &[Value]) -> RuntimeResult<Value> {
    check_arity("getUrl", args, 1, 3, "1 to 3")?;
    let url = str_arg(args, 0, "getUrl")?;
    let simple = bool_arg(args, 1, true);
    let headers = map_arg(args, 2, "getUrl")?;
    let req = with_headers(Request::new("GET", &url), &headers);
    Ok(respond(&url, client.send(&req), simple))
}

/// `postUrl(url[, body[, headers[, simple]]])`; the body is sent as JSON.
fn post_url(client: &HttpClient, args: &[Value]) -> RuntimeResult<Value> {
    check_arity("postUrl", args, 1, 4, "1 to 4")?;
    let url = str_arg(args, 0, "postUrl")?;
    let body = map_arg(args, 1, "postUrl")?;
    let headers = map_arg(args, 2, "postUrl")?;
    let simple = bool_arg(args, 3, true);
    let req = with_headers(Request::new("POST", &url), &headers)
        .json(&Value::map(body).to_json());
    Ok(respond(&url, client.send(&req), simple))
}

/// `_invokeurl({url, type, headers, parameters})`; always simple mode.
fn invoke_url(client: &HttpClient, args: &[Value]) -> RuntimeResult<Value> {
    check_arity("_invokeurl", args, 1, 1, "1")?;
    let params = match &args[0] {
        Value::Map(m) => m.borrow().clone(),
        other => {
            warn!(got = other.type_name(), "invokeurl parameters are not a map");
            return Ok(Value::from(""));
        }
    };
    // A missing url fails in the transport like any other bad url.
    let url = match params.get("url") {
        Value::Null => String::new(),
        v => v.to_string(),
    };
    let method = match params.get("type") {
        Value::Null => "GET".to_owned(),
        v => v.to_string().to_ascii_uppercase(),
    };
    let headers = match params.get("headers") {
        Value::Map(m) => m.borrow().clone(),
        _ => Map::new(),
    };
    let parameters = match params.get("parameters") {
        Value::Map(m) => m.borrow().clone(),
        _ => Map::new(),
    };

    let req = match method.as_str() {
        "GET" => with_headers(Request::new("GET", &url), &headers),
        "POST" | "PUT" | "PATCH" | "DELETE" => {
            with_headers(Request::new(&method, &url), &headers)
                .json(&Value::map(parameters).to_json())
        }
        _ => {
            warn!(url = %url, method = %method, "unsupported invokeurl method");
            return Ok(Value::from(UNSUPPORTED_METHOD));
        }
    };
    Ok(respond(&url, client.send(&req), true))
}
