use axum::{
    body::Bytes,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use tokio::net::TcpListener;
use tracing::{debug, warn};
use xmlrpc_core::message::{build_fault, build_response, parse_call};
use xmlrpc_core::{Fault, MethodCall, Struct, Value};

pub const RPC_PATH: &str = "/RPC2";
/// Always answers 500, for exercising client-side HTTP error handling.
pub const BROKEN_PATH: &str = "/broken";

pub fn app() -> Router {
    Router::new()
        .route(RPC_PATH, post(rpc))
        .route(BROKEN_PATH, post(broken))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn rpc(body: Bytes) -> Response {
    let call = match parse_call(&body) {
        Ok(call) => call,
        Err(e) => {
            warn!(error = %e, "rejecting malformed methodCall");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };
    debug!(method = %call.method_name, params = call.params.len(), "dispatching");

    let encoded = match dispatch(&call) {
        Ok(value) => build_response(&value),
        Err(fault) => build_fault(&fault),
    };
    match encoded {
        Ok(xml) => ([(header::CONTENT_TYPE, "text/xml")], xml).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
}

/// Method table of the test double.
pub fn dispatch(call: &MethodCall) -> Result<Value, Fault> {
    match call.method_name.as_str() {
        "AddInt" => {
            let [a, b] = two_params(&call.params)?;
            match (a.as_i64(), b.as_i64()) {
                (Some(a), Some(b)) => a
                    .checked_add(b)
                    .map(Value::Int)
                    .ok_or_else(|| Fault::new(2, "AddInt overflowed")),
                _ => Err(Fault::new(1, "AddInt expects two ints")),
            }
        }
        "AddString" => {
            let [a, b] = two_params(&call.params)?;
            match (a.as_str(), b.as_str()) {
                (Some(a), Some(b)) => Ok(Value::String(format!("{a}{b}"))),
                _ => Err(Fault::new(1, "AddString expects two strings")),
            }
        }
        "Echo" => Ok(Value::Array(call.params.clone())),
        "Repeat" => {
            let [text, count] = two_params(&call.params)?;
            let count = count.as_i64().and_then(|n| usize::try_from(n).ok());
            match (text.as_str(), count) {
                (Some(text), Some(count)) => Ok(Value::String(text.repeat(count))),
                _ => Err(Fault::new(1, "Repeat expects a string and a non-negative int")),
            }
        }
        "Nested" => Ok(nested_sample()),
        other => Err(Fault::new(-32601, format!("method {other:?} not found"))),
    }
}

fn two_params(params: &[Value]) -> Result<[&Value; 2], Fault> {
    match params {
        [a, b] => Ok([a, b]),
        [_, _, _, ..] => Err(Fault::new(4, "Too many parameters.")),
        _ => Err(Fault::new(3, "Too few parameters.")),
    }
}

/// Three branches, each a struct holding an array of structs that hold
/// arrays. Branch `i` carries `i + 1` entries.
pub fn nested_sample() -> Value {
    let branches = (0..3)
        .map(|i| {
            let entries = (0..=i)
                .map(|j| {
                    let mut entry = Struct::new();
                    entry.insert("id".to_string(), Value::Int(j));
                    entry.insert(
                        "tags".to_string(),
                        Value::Array(vec![Value::from(format!("t{j}")), Value::Nil]),
                    );
                    Value::Struct(entry)
                })
                .collect();
            let mut branch = Struct::new();
            branch.insert("branch".to_string(), Value::Int(i));
            branch.insert("entries".to_string(), Value::Array(entries));
            Value::Struct(branch)
        })
        .collect();
    Value::Array(branches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(method: &str, params: Vec<Value>) -> MethodCall {
        MethodCall {
            method_name: method.to_string(),
            params,
        }
    }

    #[test]
    fn add_int_sums() {
        let result = dispatch(&call("AddInt", vec![Value::Int(1), Value::Int(2)]));
        assert_eq!(result, Ok(Value::Int(3)));
    }

    #[test]
    fn add_string_concatenates() {
        let result = dispatch(&call("AddString", vec![Value::from("hello"), Value::from("world")]));
        assert_eq!(result, Ok(Value::from("helloworld")));
    }

    #[test]
    fn add_int_overflow_is_fault() {
        let err = dispatch(&call("AddInt", vec![Value::Int(i64::MAX), Value::Int(1)])).unwrap_err();
        assert_eq!(err, Fault::new(2, "AddInt overflowed"));
        let err = dispatch(&call("AddInt", vec![Value::Int(i64::MIN), Value::Int(-1)])).unwrap_err();
        assert_eq!(err.code, 2);
    }

    #[test]
    fn add_int_rejects_wrong_types() {
        let err = dispatch(&call("AddInt", vec![Value::from("1"), Value::Int(2)])).unwrap_err();
        assert_eq!(err.code, 1);
    }

    #[test]
    fn repeat_builds_string() {
        let result = dispatch(&call("Repeat", vec![Value::from("ab"), Value::Int(3)]));
        assert_eq!(result, Ok(Value::from("ababab")));
        let err = dispatch(&call("Repeat", vec![Value::from("ab"), Value::Int(-1)])).unwrap_err();
        assert_eq!(err.code, 1);
    }

    #[test]
    fn parameter_count_faults() {
        let err = dispatch(&call("AddInt", vec![Value::Int(1); 3])).unwrap_err();
        assert_eq!(err, Fault::new(4, "Too many parameters."));
        let err = dispatch(&call("AddInt", vec![Value::Int(1)])).unwrap_err();
        assert_eq!(err.code, 3);
    }

    #[test]
    fn unknown_method_faults() {
        let err = dispatch(&call("Nope", Vec::new())).unwrap_err();
        assert_eq!(err.code, -32601);
    }

    #[test]
    fn nested_sample_shape() {
        let outer = nested_sample();
        let branches = outer.as_array().unwrap();
        assert_eq!(branches.len(), 3);
        for (i, branch) in branches.iter().enumerate() {
            let entries = branch.get("entries").and_then(Value::as_array).unwrap();
            assert_eq!(entries.len(), i + 1);
        }
    }
}
