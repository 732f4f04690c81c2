//! Subscriptions and request multiplexing over a scripted WebSocket node.

mod common;

use common::MockWsNode;
use intelchain_client::config::TransportConfig;
use intelchain_client::network::TransportKind;
use intelchain_client::{ClientConfig, IntelchainClient, NetworkError, ShardEndpoint};
use serde_json::json;
use std::time::Duration;
use tokio::time::timeout;

async fn client(node: &MockWsNode) -> IntelchainClient {
    let config = ClientConfig {
        transport: TransportConfig {
            kind: TransportKind::Ws,
            request_timeout_secs: 5,
            connect_timeout_secs: 2,
        },
        shards: vec![ShardEndpoint::new(0, "http://127.0.0.1:1").with_ws(node.url())],
        ..Default::default()
    };
    IntelchainClient::from_config(&config).await.unwrap()
}

#[tokio::test]
async fn test_calls_over_websocket() {
    let node = MockWsNode::start().await;
    node.script.result("itc_blockNumber", vec![json!("0x10"), json!("0x11")]);
    let client = client(&node).await;

    let chain = client.blockchain();
    let (a, b) = tokio::join!(chain.block_number(None), chain.block_number(None));
    let mut heights = vec![a.unwrap(), b.unwrap()];
    heights.sort();
    assert_eq!(heights, vec![0x10, 0x11]);
}

#[tokio::test]
async fn test_new_heads_are_delivered() {
    let node = MockWsNode::start().await;
    node.script.result("itc_subscribe", vec![json!("0xabc")]);
    let client = client(&node).await;

    let mut sub = client.blockchain().subscribe_new_heads().await.unwrap();
    assert_eq!(sub.server_id(), "0xabc");
    assert_eq!(node.script.params_of("itc_subscribe")[0], json!(["newHeads"]));

    node.notify("0xabc", json!({"number": "0x1"}));
    node.notify("0xother", json!({"number": "0xff"}));
    node.notify("0xabc", json!({"number": "0x2"}));

    let first = timeout(Duration::from_secs(2), sub.recv()).await.unwrap();
    let second = timeout(Duration::from_secs(2), sub.recv()).await.unwrap();
    assert_eq!(first, Some(json!({"number": "0x1"})));
    assert_eq!(second, Some(json!({"number": "0x2"})));
}

#[tokio::test]
async fn test_log_subscription_carries_filter() {
    let node = MockWsNode::start().await;
    node.script.result("itc_subscribe", vec![json!("0xlogs")]);
    let client = client(&node).await;

    let filter = json!({"address": "0x0B585F8DaEfBC68a311FbD4cB20d9174aD174016"});
    let sub = client.blockchain().subscribe_logs(filter.clone()).await.unwrap();

    assert_eq!(sub.server_id(), "0xlogs");
    assert_eq!(node.script.params_of("itc_subscribe")[0], json!(["logs", filter]));
}

#[tokio::test]
async fn test_unsubscribe_releases_stream() {
    let node = MockWsNode::start().await;
    node.script.result("itc_subscribe", vec![json!("0xabc")]);
    node.script.result("itc_unsubscribe", vec![json!(true)]);
    let client = client(&node).await;

    let sub = client.blockchain().subscribe_new_heads().await.unwrap();
    assert!(client.messenger().unsubscribe(sub).await.unwrap());
    assert_eq!(node.script.params_of("itc_unsubscribe")[0], json!(["0xabc"]));
}

#[tokio::test]
async fn test_disconnect_invalidates_subscriptions_and_calls() {
    let node = MockWsNode::start().await;
    node.script.result("itc_subscribe", vec![json!("0xabc")]);
    node.script.silent("itc_getWork");
    let client = client(&node).await;

    let mut sub = client.blockchain().subscribe_new_heads().await.unwrap();
    let chain = client.blockchain().clone();
    let pending = tokio::spawn(async move { chain.get_work(None).await });
    assert!(common::wait_until(|| node.script.count("itc_getWork") == 1, Duration::from_secs(2)).await);

    node.disconnect();

    let ended = timeout(Duration::from_secs(2), sub.recv()).await.unwrap();
    assert_eq!(ended, None);
    assert_eq!(pending.await.unwrap().unwrap_err(), NetworkError::ConnectionClosed);
    assert_eq!(
        client.blockchain().block_number(None).await.unwrap_err(),
        NetworkError::ConnectionClosed
    );
}

#[tokio::test]
async fn test_http_transport_cannot_subscribe() {
    let config = ClientConfig {
        shards: vec![ShardEndpoint::new(0, "http://127.0.0.1:1")],
        ..Default::default()
    };
    let client = IntelchainClient::from_config(&config).await.unwrap();

    let err = client.blockchain().subscribe_new_heads().await.unwrap_err();
    assert_eq!(err, NetworkError::UnsupportedTransport(TransportKind::Http));
}
