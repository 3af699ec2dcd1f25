//! End-to-end tests against a live listener.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{routing::post, Router};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use netbeacon_common::{AddressResolver, FixedInterfaces, InterfaceAddr, PeerConfig};
use netbeacon_web::{ServerConfig, WebServer};

struct Instance {
    base_url: String,
    port: u16,
}

fn interfaces(addrs: &[(&str, [u8; 4])]) -> FixedInterfaces {
    let mut table = vec![InterfaceAddr::new("lo", IpAddr::V4(Ipv4Addr::LOCALHOST), true)];
    for (name, octets) in addrs {
        table.push(InterfaceAddr::new(name, IpAddr::V4(Ipv4Addr::from(*octets)), false));
    }
    FixedInterfaces(table)
}

async fn spawn_instance(interfaces: FixedInterfaces, peer_port: u16) -> Instance {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();

    let config = ServerConfig {
        listen: addr,
        peer: PeerConfig {
            port: peer_port,
            timeout_ms: 2_000,
            ..Default::default()
        },
        ..Default::default()
    };
    let resolver = AddressResolver::new(reqwest::Client::new()).with_interfaces(interfaces);
    let server = WebServer::with_resolver(config, Arc::new(resolver)).unwrap();

    tokio::spawn(server.serve_with_shutdown(listener, std::future::pending()));

    Instance {
        base_url: format!("http://{}", addr),
        port: addr.port(),
    }
}

fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn get_json(url: String) -> Value {
    reqwest::get(url).await.unwrap().json().await.unwrap()
}

async fn post_json(url: String, body: Value) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(url)
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn ip_info_reports_private_addresses_and_sentinel() {
    let instance = spawn_instance(
        interfaces(&[("eth0", [172, 31, 4, 20]), ("eth1", [10, 8, 0, 3])]),
        closed_port(),
    )
    .await;

    let info = get_json(format!("{}/api/ip-info", instance.base_url)).await;

    assert_eq!(info["publicIP"], "N/A");
    assert_eq!(
        info["privateIPs"],
        json!([
            {"interface": "eth0", "address": "172.31.4.20"},
            {"interface": "eth1", "address": "10.8.0.3"},
        ])
    );
    let ts = info["timestamp"].as_str().unwrap();
    assert!(DateTime::parse_from_rfc3339(ts).is_ok());
    assert!(ts.ends_with('Z'));
}

#[tokio::test]
async fn register_then_list_preserves_order() {
    let instance = spawn_instance(interfaces(&[("eth0", [10, 0, 0, 1])]), closed_port()).await;
    let before = Utc::now();

    for (i, sender) in ["10.0.1.1", "10.0.1.2", "10.0.1.3"].iter().enumerate() {
        let (status, body) = post_json(
            format!("{}/api/peer/register", instance.base_url),
            json!({"fromPrivateIP": sender, "note": format!("n{}", i)}),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["ok"], true);
        assert_eq!(body["total"], i + 1);
        assert_eq!(body["received"]["client"], "127.0.0.1");
    }

    let list = get_json(format!("{}/api/peer/received", instance.base_url)).await;
    assert_eq!(list["count"], 3);

    let items = list["items"].as_array().unwrap();
    let senders: Vec<&str> = items
        .iter()
        .map(|item| item["fromPrivateIP"].as_str().unwrap())
        .collect();
    assert_eq!(senders, vec!["10.0.1.1", "10.0.1.2", "10.0.1.3"]);

    let stamps: Vec<DateTime<Utc>> = items
        .iter()
        .map(|item| {
            DateTime::parse_from_rfc3339(item["receivedAt"].as_str().unwrap())
                .unwrap()
                .with_timezone(&Utc)
        })
        .collect();
    for pair in stamps.windows(2) {
        assert!(pair[0] <= pair[1]);
    }
    // Millisecond precision on the wire.
    assert!(stamps[0] >= before - chrono::Duration::milliseconds(1));
}

#[tokio::test]
async fn register_with_empty_body_applies_defaults() {
    let instance = spawn_instance(interfaces(&[]), closed_port()).await;

    let (status, body) = post_json(
        format!("{}/api/peer/register", instance.base_url),
        json!({}),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["received"]["fromPrivateIP"], "unknown");
    assert_eq!(body["received"]["note"], "");
    assert!(body["received"]["xff"].is_null());
}

#[tokio::test]
async fn send_requires_peer_host() {
    let instance = spawn_instance(interfaces(&[("eth0", [10, 0, 0, 1])]), closed_port()).await;

    let (status, body) = post_json(
        format!("{}/api/peer/send", instance.base_url),
        json!({"note": "x"}),
    )
    .await;

    assert_eq!(status, 400);
    assert_eq!(body, json!({"ok": false, "error": "peerHost is required"}));
}

#[tokio::test]
async fn send_without_private_address_is_500() {
    let instance = spawn_instance(interfaces(&[]), closed_port()).await;

    let (status, body) = post_json(
        format!("{}/api/peer/send", instance.base_url),
        json!({"peerHost": "127.0.0.1"}),
    )
    .await;

    assert_eq!(status, 500);
    assert_eq!(body["ok"], false);
    assert!(body["error"].as_str().unwrap().contains("private IPv4"));
}

#[tokio::test]
async fn send_to_unreachable_peer_is_502() {
    let instance = spawn_instance(interfaces(&[("eth0", [10, 0, 0, 1])]), closed_port()).await;

    let started = Instant::now();
    let (status, body) = post_json(
        format!("{}/api/peer/send", instance.base_url),
        json!({"peerHost": "127.0.0.1", "note": "x"}),
    )
    .await;

    assert_eq!(status, 502);
    assert_eq!(body["ok"], false);
    assert!(!body["error"].as_str().unwrap().is_empty());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn two_instances_exchange_handshake() {
    let receiver = spawn_instance(interfaces(&[("eth0", [10, 0, 0, 2])]), closed_port()).await;
    let sender = spawn_instance(
        interfaces(&[("eth0", [10, 0, 0, 1]), ("eth1", [192, 168, 5, 1])]),
        receiver.port,
    )
    .await;

    let (status, body) = post_json(
        format!("{}/api/peer/send", sender.base_url),
        json!({"peerHost": "127.0.0.1", "note": "hi there"}),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["ok"], true);
    assert_eq!(
        body["sentTo"],
        format!("http://127.0.0.1:{}/api/peer/register", receiver.port)
    );
    assert_eq!(body["myPrivateIP"], "10.0.0.1");
    assert_eq!(body["peerResponse"]["ok"], true);
    assert_eq!(body["peerResponse"]["total"], 1);
    assert_eq!(body["peerResponse"]["received"]["fromPrivateIP"], "10.0.0.1");

    let list = get_json(format!("{}/api/peer/received", receiver.base_url)).await;
    assert_eq!(list["count"], 1);
    assert_eq!(list["items"][0]["fromPrivateIP"], "10.0.0.1");
    assert_eq!(list["items"][0]["note"], "hi there");

    // The sender's own log is untouched.
    let own = get_json(format!("{}/api/peer/received", sender.base_url)).await;
    assert_eq!(own["count"], 0);
}

#[tokio::test]
async fn send_uses_default_note() {
    let receiver = spawn_instance(interfaces(&[("eth0", [10, 0, 0, 2])]), closed_port()).await;
    let sender = spawn_instance(interfaces(&[("eth0", [10, 0, 0, 1])]), receiver.port).await;

    let (status, _) = post_json(
        format!("{}/api/peer/send", sender.base_url),
        json!({"peerHost": "127.0.0.1"}),
    )
    .await;
    assert_eq!(status, 200);

    let list = get_json(format!("{}/api/peer/received", receiver.base_url)).await;
    assert_eq!(list["items"][0]["note"], "hello from peer");
}

#[tokio::test]
async fn non_json_peer_reply_becomes_empty_object() {
    let stub = Router::new().route("/api/peer/register", post(|| async { "registered" }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let stub_port = listener.local_addr().unwrap().port();
    tokio::spawn(async move { axum::serve(listener, stub).await });

    let sender = spawn_instance(interfaces(&[("eth0", [10, 0, 0, 1])]), stub_port).await;

    let (status, body) = post_json(
        format!("{}/api/peer/send", sender.base_url),
        json!({"peerHost": "127.0.0.1"}),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["ok"], true);
    assert_eq!(body["peerResponse"], json!({}));
}

#[tokio::test]
async fn forwarded_for_header_is_recorded() {
    let instance = spawn_instance(interfaces(&[]), closed_port()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/peer/register", instance.base_url))
        .header("X-Forwarded-For", "203.0.113.9, 10.0.0.254")
        .json(&json!({"fromPrivateIP": "10.0.9.9"}))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();

    assert_eq!(body["received"]["xff"], "203.0.113.9, 10.0.0.254");
}
