//! Shard routing and live reconfiguration against scripted HTTP nodes.

mod common;

use common::MockHttpNode;
use intelchain_client::{
    ChainType, ClientConfig, IntelchainClient, NetworkError, RpcMethod, ShardEndpoint,
};
use serde_json::json;
use std::time::Duration;

async fn client(shards: Vec<ShardEndpoint>) -> IntelchainClient {
    let config = ClientConfig {
        shards,
        ..Default::default()
    };
    IntelchainClient::from_config(&config).await.unwrap()
}

#[tokio::test]
async fn test_calls_route_to_requested_shard() {
    let shard0 = MockHttpNode::start().await;
    let shard1 = MockHttpNode::start().await;
    shard0.script.result("itc_blockNumber", vec![json!("0x10")]);
    shard1.script.result("itc_blockNumber", vec![json!("0x20")]);

    let client = client(vec![
        ShardEndpoint::new(0, shard0.url()),
        ShardEndpoint::new(1, shard1.url()).current(),
    ])
    .await;
    let chain = client.blockchain();

    assert_eq!(chain.block_number(None).await.unwrap(), 0x20);
    assert_eq!(chain.block_number(Some(0)).await.unwrap(), 0x10);
    assert_eq!(shard0.script.count("itc_blockNumber"), 1);
    assert_eq!(shard1.script.count("itc_blockNumber"), 1);
}

#[tokio::test]
async fn test_unknown_shard_makes_no_call() {
    let shard0 = MockHttpNode::start().await;
    shard0.script.result("itc_blockNumber", vec![json!("0x10")]);

    let client = client(vec![ShardEndpoint::new(0, shard0.url())]).await;
    let err = client.blockchain().block_number(Some(9)).await.unwrap_err();

    assert_eq!(err, NetworkError::UnknownShard(9));
    assert!(shard0.script.methods().is_empty());
}

#[tokio::test]
async fn test_chain_type_switch_changes_prefix() {
    let shard0 = MockHttpNode::start().await;
    shard0.script.result("itc_gasPrice", vec![json!("0x1")]);
    shard0.script.result("eth_gasPrice", vec![json!("0x2")]);
    shard0.script.result("net_version", vec![json!("2")]);

    let client = client(vec![ShardEndpoint::new(0, shard0.url())]).await;
    let messenger = client.messenger();

    assert_eq!(messenger.send(RpcMethod::GasPrice, vec![], None).await.unwrap(), json!("0x1"));
    client.set_chain_type(ChainType::Ethereum);
    assert_eq!(messenger.send(RpcMethod::GasPrice, vec![], None).await.unwrap(), json!("0x2"));
    assert_eq!(messenger.send(RpcMethod::NetVersion, vec![], None).await.unwrap(), json!("2"));

    assert_eq!(
        shard0.script.methods(),
        vec!["itc_gasPrice", "eth_gasPrice", "net_version"]
    );
}

#[tokio::test]
async fn test_raw_method_names_are_rewritten() {
    let shard0 = MockHttpNode::start().await;
    shard0.script.result("eth_blockNumber", vec![json!("0x5")]);

    let client = client(vec![ShardEndpoint::new(0, shard0.url())]).await;
    client.set_chain_type(ChainType::Ethereum);

    let result = client
        .messenger()
        .send_method("itc_blockNumber", vec![], Some(0))
        .await
        .unwrap();
    assert_eq!(result, json!("0x5"));
}

#[tokio::test]
async fn test_rpc_error_is_not_retried() {
    let shard0 = MockHttpNode::start().await;
    shard0.script.error("itc_getBalance", -32602, "invalid argument 0");

    let client = client(vec![ShardEndpoint::new(0, shard0.url())]).await;
    let err = client
        .messenger()
        .send(RpcMethod::GetBalance, vec![json!("0x00")], None)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        NetworkError::Rpc {
            code: -32602,
            message: "invalid argument 0".into()
        }
    );
    assert_eq!(shard0.script.count("itc_getBalance"), 1);
}

#[tokio::test]
async fn test_sync_sharding_structure_adopts_node_view() {
    let bootstrap = MockHttpNode::start().await;
    let shard0 = MockHttpNode::start().await;
    let shard1 = MockHttpNode::start().await;
    bootstrap.script.result(
        "itc_getShardingStructure",
        vec![json!([
            {"shardID": 0, "current": false, "http": shard0.url(), "ws": "ws://127.0.0.1:1"},
            {"shardID": 1, "current": true, "http": shard1.url(), "ws": "ws://127.0.0.1:2"}
        ])],
    );
    shard1.script.result("itc_blockNumber", vec![json!("0x99")]);

    let client = client(vec![ShardEndpoint::new(0, bootstrap.url())]).await;
    let shards = client.sync_sharding_structure().await.unwrap();

    assert_eq!(shards.len(), 2);
    assert_eq!(client.messenger().default_shard(), 1);
    assert_eq!(client.blockchain().block_number(None).await.unwrap(), 0x99);
    assert_eq!(
        client.messenger().shards()[0].http_url,
        shard0.url()
    );
}

#[tokio::test]
async fn test_in_flight_call_survives_reconfigure() {
    let old = MockHttpNode::start().await;
    let new = MockHttpNode::start().await;
    old.script.result("itc_blockNumber", vec![json!("0x1")]);
    old.script.delay(Duration::from_millis(200));
    new.script.result("itc_blockNumber", vec![json!("0x2")]);

    let client = client(vec![ShardEndpoint::new(0, old.url())]).await;

    let chain = client.blockchain().clone();
    let in_flight = tokio::spawn(async move { chain.block_number(Some(0)).await });
    assert!(common::wait_until(|| old.script.count("itc_blockNumber") == 1, Duration::from_secs(2)).await);

    client
        .sharding_structures(vec![ShardEndpoint::new(0, new.url())])
        .await
        .unwrap();

    assert_eq!(in_flight.await.unwrap().unwrap(), 0x1);
    assert_eq!(client.blockchain().block_number(Some(0)).await.unwrap(), 0x2);
}

#[tokio::test]
async fn test_removed_shard_becomes_unknown() {
    let shard0 = MockHttpNode::start().await;
    let shard1 = MockHttpNode::start().await;

    let client = client(vec![
        ShardEndpoint::new(0, shard0.url()),
        ShardEndpoint::new(1, shard1.url()).current(),
    ])
    .await;

    client
        .sharding_structures(vec![ShardEndpoint::new(0, shard0.url())])
        .await
        .unwrap();

    assert_eq!(client.messenger().default_shard(), 0);
    assert_eq!(
        client.blockchain().block_number(Some(1)).await.unwrap_err(),
        NetworkError::UnknownShard(1)
    );
    assert!(shard1.script.methods().is_empty());
}
