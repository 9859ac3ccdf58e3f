//
// Copyright 2026 The AMQP-Relay Authors. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Integration tests for downstream disconnect recovery and reconnect
//! scheduling.

use amqp_relay::memory::{MemoryConnectionFactory, MemoryReceiver, MemorySenderFactory};
use amqp_relay::{
    conditions, DownstreamAdapter, ForwardingRelay, RelayConfig, TelemetryPolicy,
};
use std::sync::Arc;
use std::time::Duration;

fn relay(
    config: RelayConfig,
) -> (
    ForwardingRelay<TelemetryPolicy>,
    Arc<MemoryConnectionFactory>,
    Arc<MemorySenderFactory>,
) {
    let connections = Arc::new(MemoryConnectionFactory::new());
    let senders = Arc::new(MemorySenderFactory::new());
    let relay = ForwardingRelay::new(config, connections.clone(), senders.clone(), TelemetryPolicy);
    (relay, connections, senders)
}

fn wait_config() -> RelayConfig {
    RelayConfig {
        wait_for_downstream_connection: true,
        ..Default::default()
    }
}

fn receiver(connection_id: &str, link_id: &str) -> Arc<MemoryReceiver> {
    Arc::new(MemoryReceiver::new(
        connection_id,
        link_id,
        "telemetry/TENANT1",
    ))
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_closes_receivers_and_reconnects() {
    let (relay, connections, _) = relay(wait_config());
    relay.start().await.unwrap();

    let r1 = receiver("con-a", "link-1");
    let r2 = receiver("con-b", "link-1");
    relay.on_client_attach(r1.clone()).await.unwrap();
    relay.on_client_attach(r2.clone()).await.unwrap();
    assert_eq!(relay.active_links(), 2);

    let connection = connections.last_connection().unwrap();
    connection.fire_disconnect();

    assert_eq!(r1.closed_with(), Some(conditions::NO_DOWNSTREAM_CONSUMER));
    assert_eq!(r2.closed_with(), Some(conditions::NO_DOWNSTREAM_CONSUMER));
    assert_eq!(relay.active_links(), 0);
    assert!(!relay.is_connected());
    assert_eq!(relay.metrics().downstream_disconnects(), 1);

    // the reconnect timer fires after 300ms
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(connections.connection_count(), 2);
    assert!(relay.is_connected());
    assert_eq!(relay.metrics().reconnect_attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_schedules_at_most_one_reconnect() {
    let (relay, connections, _) = relay(wait_config());
    relay.start().await.unwrap();

    let connection = connections.last_connection().unwrap();
    connection.fire_disconnect();
    // a second event for the same outage must not arm a second timer
    connection.fire_disconnect();

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(connections.connection_count(), 2);
    assert_eq!(relay.metrics().reconnect_attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_remote_close_triggers_disconnect_recovery() {
    let (relay, connections, _) = relay(wait_config());
    relay.start().await.unwrap();

    let r1 = receiver("con-a", "link-1");
    relay.on_client_attach(r1.clone()).await.unwrap();

    let connection = connections.last_connection().unwrap();
    connection.fire_remote_close();

    assert!(connection.is_closed());
    assert_eq!(r1.closed_with(), Some(conditions::NO_DOWNSTREAM_CONSUMER));
    assert_eq!(relay.active_links(), 0);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(connections.connection_count(), 2);
    assert_eq!(relay.metrics().reconnect_attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_no_reconnect_when_attempts_disabled() {
    let config = RelayConfig {
        reconnect_attempts: 0,
        ..wait_config()
    };
    let (relay, connections, _) = relay(config);
    relay.start().await.unwrap();

    connections.last_connection().unwrap().fire_disconnect();

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(connections.connection_count(), 1);
    assert_eq!(relay.metrics().reconnect_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_pending_reconnect() {
    let (relay, connections, _) = relay(wait_config());
    relay.start().await.unwrap();

    connections.last_connection().unwrap().fire_disconnect();
    relay.stop().await.unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(connections.connection_count(), 1);
    assert_eq!(relay.metrics().reconnect_attempts(), 0);
}

#[tokio::test]
async fn test_callbacks_ignored_after_stop() {
    let (relay, connections, senders) = relay(wait_config());
    relay.start().await.unwrap();

    let r1 = receiver("con-a", "link-1");
    relay.on_client_attach(r1.clone()).await.unwrap();
    let sender = senders.last_sender().unwrap();
    let connection = connections.last_connection().unwrap();

    relay.stop().await.unwrap();

    // a FLOW arriving for the defunct sender grants nothing upstream
    sender.set_credit(10);
    sender.fire_flow();
    assert!(r1.replenished().is_empty());

    // a late disconnect event no longer reaches the relay
    connection.fire_disconnect();
    assert!(r1.closed_with().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_attach_succeeds_after_reconnect() {
    let (relay, connections, senders) = relay(wait_config());
    relay.start().await.unwrap();

    let r1 = receiver("con-a", "link-1");
    relay.on_client_attach(r1.clone()).await.unwrap();

    connections.last_connection().unwrap().fire_disconnect();
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(connections.connection_count(), 2);

    // the producer reattaches and gets a fresh downstream sender
    let r1 = receiver("con-a", "link-1");
    relay.on_client_attach(r1).await.unwrap();
    assert_eq!(senders.sender_count(), 2);
    assert_eq!(relay.active_links(), 1);
}
