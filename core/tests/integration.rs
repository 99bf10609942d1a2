//! End-to-end calls against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port in a background thread, then
//! drives `Client::call` over real HTTP through the default `UreqTransport`.
//! Validates that request framing, transport and response decoding work
//! together, including faults and HTTP error statuses.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use xmlrpc_core::{Client, ClientConfig, Encodable, Error, Struct, Value};

fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn rpc_url(addr: SocketAddr) -> String {
    format!("http://{addr}{}", mock_server::RPC_PATH)
}

#[test]
fn add_int_and_add_string() {
    let client = Client::new(&rpc_url(start_server()));

    let sum = client.call("AddInt", &[&1, &2]).unwrap();
    assert_eq!(sum, Value::Int(3));

    let joined = client.call("AddString", &[&"hello", &"world"]).unwrap();
    assert_eq!(joined.as_str(), Some("helloworld"));
}

#[test]
fn echo_round_trips_every_kind() {
    let client = Client::from_config(&ClientConfig::new(&rpc_url(start_server())));

    let mut record = Struct::new();
    record.insert("test1".to_string(), Value::from("a"));
    record.insert("test2".to_string(), Value::Int(2));
    let args = vec![
        Value::Nil,
        Value::Bool(false),
        Value::Int(-7),
        Value::Double(6.02e23),
        Value::from("  <xml> & 'quotes' \"too\"  "),
        Value::DateTime(Utc.with_ymd_and_hms(2020, 5, 17, 8, 30, 0).unwrap().fixed_offset()),
        Value::Bytes(vec![0xde, 0xad, 0xbe, 0xef]),
        Value::Array(vec![Value::Struct(record.clone()), Value::Int(2)]),
        Value::Struct(record),
    ];
    let refs: Vec<&dyn Encodable> = args.iter().map(|v| v as &dyn Encodable).collect();

    let echoed = client.call("Echo", &refs).unwrap();
    assert_eq!(echoed, Value::Array(args));
}

#[test]
fn nested_response_keeps_counts() {
    let client = Client::new(&rpc_url(start_server()));
    let value = client.call("Nested", &[]).unwrap();
    let branches = value.as_array().unwrap();
    assert_eq!(branches.len(), 3);
    for (i, branch) in branches.iter().enumerate() {
        let entries = branch.get("entries").and_then(Value::as_array).unwrap();
        assert_eq!(entries.len(), i + 1);
    }
    assert_eq!(value, mock_server::nested_sample());
}

#[test]
fn large_response_is_read_whole() {
    const LEN: i64 = 11 * 1024 * 1024;
    let client = Client::new(&rpc_url(start_server()));
    let value = client.call("Repeat", &[&"x", &LEN]).unwrap();
    let text = value.as_str().unwrap();
    assert_eq!(text.len() as i64, LEN);
    assert!(text.bytes().all(|b| b == b'x'));
}

#[test]
fn configured_response_limit_is_enforced() {
    let addr = start_server();
    let mut config = ClientConfig::new(&rpc_url(addr));
    config.max_response_bytes = Some(1024);
    let client = Client::from_config(&config);

    let err = client.call("Repeat", &[&"x", &4096]).unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "{err:?}");
    assert_eq!(client.call("Repeat", &[&"x", &16]).unwrap(), Value::from("x".repeat(16)));
}

#[test]
fn fault_surfaces_as_error() {
    let client = Client::new(&rpc_url(start_server()));
    let err = client.call("AddInt", &[&1, &2, &3]).unwrap_err();
    match err {
        Error::RemoteFault(fault) => {
            assert_eq!(fault.code, 4);
            assert_eq!(fault.message, "Too many parameters.");
        }
        other => panic!("expected RemoteFault, got {other:?}"),
    }
}

#[test]
fn error_status_is_http_error() {
    let addr = start_server();
    let client = Client::new(&format!("http://{addr}{}", mock_server::BROKEN_PATH));
    let err = client.call("AddInt", &[&1, &2]).unwrap_err();
    assert!(matches!(err, Error::HttpError { status: 500, .. }), "{err:?}");

    // the server keeps answering after an error response
    let client = Client::new(&rpc_url(addr));
    assert_eq!(client.call("AddInt", &[&2, &2]).unwrap(), Value::Int(4));
}

#[test]
fn missing_route_is_http_error() {
    let addr = start_server();
    let client = Client::new(&format!("http://{addr}/nope"));
    assert!(matches!(
        client.call("AddInt", &[&1, &2]),
        Err(Error::HttpError { status: 404, .. })
    ));
}

#[test]
fn free_function_call_reuses_shared_transport() {
    let url = rpc_url(start_server());
    for i in 0..5 {
        assert_eq!(xmlrpc_core::call(&url, "AddInt", &[&i, &1]).unwrap(), Value::Int(i + 1));
    }
}

#[test]
fn client_is_shared_across_threads() {
    let client = Arc::new(Client::new(&rpc_url(start_server())));
    let handles: Vec<_> = (0..4i64)
        .map(|i| {
            let client = Arc::clone(&client);
            std::thread::spawn(move || client.call("AddInt", &[&i, &i]).unwrap())
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), Value::Int(2 * i as i64));
    }
}
