//! Verify call framing and response parsing against JSON test vectors stored
//! in `test-vectors/`.
//!
//! Each response case pairs a raw HTTP status and body with either the
//! expected decoded value (in `Value`'s serde form) or the expected error
//! kind. Call cases pair a method and arguments with the exact request body.

use xmlrpc_core::{Client, Encodable, Error, Fault, HttpResponse, Transport, Value};

const ENDPOINT: &str = "http://localhost:3000/RPC2";

/// Never reached: the vectors only exercise the build and parse halves.
struct NoTransport;

impl Transport for NoTransport {
    fn post(&self, _request: &xmlrpc_core::HttpRequest) -> xmlrpc_core::Result<HttpResponse> {
        panic!("test vectors must not touch the transport")
    }
}

fn client() -> Client<NoTransport> {
    Client::with_transport(ENDPOINT, NoTransport)
}

fn error_kind(err: &Error) -> &'static str {
    match err {
        Error::MalformedStructure(_) => "MalformedStructure",
        Error::MalformedStruct(_) => "MalformedStruct",
        Error::MalformedResponse(_) => "MalformedResponse",
        Error::InvalidBoolean(_) => "InvalidBoolean",
        Error::InvalidInteger(_) => "InvalidInteger",
        Error::InvalidFloat(_) => "InvalidFloat",
        Error::InvalidDateTime(_) => "InvalidDateTime",
        Error::InvalidBase64(_) => "InvalidBase64",
        Error::UnsupportedType(_) => "UnsupportedType",
        Error::RemoteFault(_) => "RemoteFault",
        Error::HttpError { .. } => "HttpError",
        Error::Transport(_) => "Transport",
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[test]
fn response_test_vectors() {
    let raw = include_str!("../../test-vectors/responses.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let response = HttpResponse {
            status: case["status"].as_u64().unwrap() as u16,
            body: case["body"].as_str().unwrap().as_bytes().to_vec(),
        };
        let result = c.parse_response(response);

        if let Some(expected_error) = case.get("expected_error") {
            let err = result.unwrap_err();
            assert_eq!(error_kind(&err), expected_error.as_str().unwrap(), "{name}: {err}");
            if let Some(expected_fault) = case.get("expected_fault") {
                let expected: Fault = serde_json::from_value(expected_fault.clone()).unwrap();
                assert_eq!(err.fault(), Some(&expected), "{name}: fault");
            }
        } else {
            let value = result.unwrap_or_else(|e| panic!("{name}: {e}"));
            let expected: Value = serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(value, expected, "{name}: parsed result");
        }
    }
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

#[test]
fn call_test_vectors() {
    let raw = include_str!("../../test-vectors/calls.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let method = case["method"].as_str().unwrap();
        let args: Vec<Value> = serde_json::from_value(case["args"].clone()).unwrap();
        let refs: Vec<&dyn Encodable> = args.iter().map(|v| v as &dyn Encodable).collect();

        let req = c.build_call(method, &refs).unwrap();
        assert_eq!(req.url, ENDPOINT, "{name}: url");
        let body = String::from_utf8(req.body).unwrap();
        assert_eq!(body, case["expected_body"].as_str().unwrap(), "{name}: body");

        // the server side sees the same arguments
        let call = xmlrpc_core::message::parse_call(body.as_bytes()).unwrap();
        assert_eq!(call.method_name, method, "{name}: method");
        assert_eq!(call.params, args, "{name}: params");
    }
}
