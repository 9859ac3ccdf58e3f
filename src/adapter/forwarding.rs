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

//! The forwarding engine.

use crate::adapter::traits::{DownstreamAdapter, ForwardingPolicy};
use crate::address::ResourceAddress;
use crate::config::RelayConfig;
use crate::connection::{
    ConnectError, Connection, ConnectionFactory, DisconnectHandler, DownstreamConnector,
    RemoteCloseHandler,
};
use crate::error::RelayError;
use crate::link::conditions;
use crate::link::{
    Delivery, Disposition, DownstreamSender, LinkError, LinkKey, LinkRegistry, Message,
    SenderHandle, UpstreamReceiver,
};
use crate::observability::RelayMetrics;
use crate::sender::{FlowHandler, SenderFactory};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Delay before re-connecting after an unexpected downstream disconnect.
const RECONNECT_DELAY: Duration = Duration::from_millis(300);

/// Forwards messages from upstream producer links to a downstream AMQP
/// 1.0 container.
///
/// The relay pairs every attached [`UpstreamReceiver`] with a downstream
/// sender created through the injected [`SenderFactory`], propagates
/// credit and drain requests end to end, and settles deliveries according
/// to its [`ForwardingPolicy`]. A lost downstream connection closes all
/// upstream receivers (producers reattach and new senders are built) and
/// schedules a single reconnect.
///
/// Cloning is cheap; clones share the same engine state.
///
/// All engine state lives behind one mutex. Critical sections are short
/// and never held across an await, so callbacks arriving from any task are
/// serialized exactly like the single event loop the AMQP I/O layer runs.
pub struct ForwardingRelay<P: ForwardingPolicy> {
    inner: Arc<Inner<P>>,
}

impl<P: ForwardingPolicy> Clone for ForwardingRelay<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<P> {
    config: RelayConfig,
    connector: DownstreamConnector,
    sender_factory: Arc<dyn SenderFactory>,
    policy: P,
    metrics: Arc<RelayMetrics>,
    state: Mutex<EngineState>,
}

struct EngineState {
    running: bool,
    registry: LinkRegistry,
    /// Pending reconnect timer; at most one per disconnect event.
    reconnect: Option<JoinHandle<()>>,
}

impl<P: ForwardingPolicy> ForwardingRelay<P> {
    /// Creates a relay from its configuration, the two downstream
    /// factories, and the message-kind policy.
    #[must_use]
    pub fn new(
        config: RelayConfig,
        connection_factory: Arc<dyn ConnectionFactory>,
        sender_factory: Arc<dyn SenderFactory>,
        policy: P,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                connector: DownstreamConnector::new(connection_factory),
                sender_factory,
                policy,
                metrics: Arc::new(RelayMetrics::new()),
                state: Mutex::new(EngineState {
                    running: false,
                    registry: LinkRegistry::new(),
                    reconnect: None,
                }),
            }),
        }
    }

    /// The relay's configuration.
    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    /// The relay's activity counters.
    #[must_use]
    pub fn metrics(&self) -> Arc<RelayMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    /// Whether `start` has completed and `stop` has not been called.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.state.lock().running
    }

    /// Whether a downstream connection exists and is not disconnected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connector.is_connected()
    }

    /// The container name of the downstream peer, or `None` while not
    /// connected.
    #[must_use]
    pub fn downstream_container(&self) -> Option<String> {
        self.inner
            .connector
            .connection()
            .and_then(|connection| connection.remote_container())
    }

    /// The number of upstream receivers with a registered downstream
    /// sender.
    #[must_use]
    pub fn active_links(&self) -> usize {
        self.inner.state.lock().registry.len()
    }

    /// Handles a FLOW frame the downstream container sent for `sender`.
    ///
    /// A drain request is forwarded upstream and, once the upstream side
    /// completes within the configured deadline, signalled back with
    /// `drained`. A plain credit top-up grants the upstream producer the
    /// sender's available window. Invoked by the flow handler the relay
    /// registers at sender creation; exposed for server layers that route
    /// FLOW events themselves.
    pub fn handle_flow(
        &self,
        sender: &Arc<dyn DownstreamSender>,
        receiver: &Arc<dyn UpstreamReceiver>,
    ) {
        self.inner.handle_flow(sender, receiver);
    }
}

#[async_trait]
impl<P: ForwardingPolicy> DownstreamAdapter for ForwardingRelay<P> {
    async fn start(&self) -> Result<(), RelayError> {
        {
            let mut state = self.inner.state.lock();
            if state.running {
                return Ok(());
            }
            state.running = true;
        }
        if self.inner.config.wait_for_downstream_connection {
            info!("waiting for connection to downstream container");
            connect_to_downstream(&self.inner).await?;
            Ok(())
        } else {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                // the connector logs a failed attempt
                let _ = connect_to_downstream(&inner).await;
            });
            Ok(())
        }
    }

    async fn stop(&self) -> Result<(), RelayError> {
        let reconnect = {
            let mut state = self.inner.state.lock();
            if !state.running {
                debug!("relay already stopped");
                return Ok(());
            }
            state.running = false;
            state.reconnect.take()
        };
        if let Some(timer) = reconnect {
            timer.abort();
        }
        self.inner.connector.close();
        Ok(())
    }

    async fn on_client_attach(
        &self,
        receiver: Arc<dyn UpstreamReceiver>,
    ) -> Result<(), RelayError> {
        let key = LinkKey::for_receiver(receiver.as_ref());
        {
            let state = self.inner.state.lock();
            if !state.running {
                return Err(RelayError::NotStarted);
            }
            if let Some(handle) = state.registry.get(&key) {
                if handle.is_open() {
                    info!(link = %key, "reusing existing downstream sender");
                    return Ok(());
                }
            }
        }
        match create_sender(&self.inner, &receiver).await {
            Ok(sender) => {
                let handle = SenderHandle::new(sender, key.connection_id());
                let mut state = self.inner.state.lock();
                if !state.running {
                    // stopped while the attach was in flight
                    handle.sender().close();
                    return Err(RelayError::NotStarted);
                }
                state.registry.insert(receiver, handle);
                drop(state);
                info!(link = %key, "created downstream sender");
                self.inner.metrics.record_sender_created();
                Ok(())
            }
            Err(error) => {
                warn!(link = %key, %error, "cannot create downstream sender");
                if let Some(handle) = self.inner.remove_link(&key) {
                    self.inner.close_if_open(&key, &handle);
                }
                Err(RelayError::Link(error))
            }
        }
    }

    fn on_client_detach(&self, receiver: &dyn UpstreamReceiver) -> Result<(), RelayError> {
        let key = LinkKey::for_receiver(receiver);
        let removed = {
            let mut state = self.inner.state.lock();
            if !state.running {
                return Err(RelayError::NotStarted);
            }
            state.registry.remove(&key)
        };
        if let Some(handle) = removed {
            self.inner.close_if_open(&key, &handle);
        }
        Ok(())
    }

    fn on_client_disconnect(&self, connection_id: &str) -> Result<(), RelayError> {
        let links = {
            let mut state = self.inner.state.lock();
            if !state.running {
                return Err(RelayError::NotStarted);
            }
            state.registry.remove_connection(connection_id)
        };
        if !links.is_empty() {
            info!(
                connection = connection_id,
                senders = links.len(),
                "closing downstream senders for connection"
            );
            for (receiver, handle) in &links {
                let key = LinkKey::for_receiver(receiver.as_ref());
                self.inner.close_if_open(&key, handle);
            }
        }
        Ok(())
    }

    fn process_message(
        &self,
        receiver: &dyn UpstreamReceiver,
        delivery: Box<dyn Delivery>,
        message: Message,
    ) -> Result<(), RelayError> {
        let key = LinkKey::for_receiver(receiver);
        let handle = {
            let state = self.inner.state.lock();
            if !state.running {
                return Err(RelayError::NotStarted);
            }
            state.registry.get(&key).cloned()
        };
        let Some(handle) = handle else {
            info!(
                link = %key,
                "no downstream sender available, discarding message and closing link with client"
            );
            self.inner.metrics.record_message_discarded();
            receiver.close(&conditions::NO_DOWNSTREAM_CONSUMER);
            return Ok(());
        };
        let sender = handle.sender();
        if !sender.is_open() {
            warn!(
                link = %key,
                "downstream sender is not open, discarding message and closing link with client"
            );
            self.inner.metrics.record_message_discarded();
            receiver.close(&conditions::NO_DOWNSTREAM_CONSUMER);
            if let Some(removed) = self.inner.remove_link(&key) {
                self.inner.close_if_open(&key, &removed);
            }
            return Ok(());
        }
        if sender.credit() == 0 {
            if delivery.remotely_settled() {
                debug!(
                    link = %key,
                    message_id = ?message.message_id,
                    "no downstream credit available, discarding pre-settled message"
                );
                self.inner.metrics.record_message_discarded();
                delivery.settle(Disposition::Accepted);
            } else {
                debug!(
                    link = %key,
                    message_id = ?message.message_id,
                    "no downstream credit available, releasing message"
                );
                self.inner.metrics.record_message_released();
                delivery.settle(Disposition::Released);
            }
            return Ok(());
        }
        // keep the producer supplied before more credit flows in from the
        // downstream container
        receiver.replenish(available_downstream_credit(sender.as_ref()));
        trace!(
            link = %key,
            message_id = ?message.message_id,
            content_type = ?message.content_type,
            credit = sender.credit(),
            queued = sender.queued(),
            "forwarding message to downstream container"
        );
        self.inner.metrics.record_message_forwarded();
        self.inner.policy.forward_message(sender, message, delivery);
        Ok(())
    }
}

impl<P: ForwardingPolicy> Inner<P> {
    fn remove_link(&self, key: &LinkKey) -> Option<SenderHandle> {
        self.state.lock().registry.remove(key)
    }

    fn close_if_open(&self, key: &LinkKey, handle: &SenderHandle) {
        if handle.is_open() {
            info!(link = %key, "closing downstream sender");
            handle.sender().close();
            self.metrics.record_sender_closed();
        }
    }

    fn handle_flow(
        &self,
        sender: &Arc<dyn DownstreamSender>,
        receiver: &Arc<dyn UpstreamReceiver>,
    ) {
        if !self.state.lock().running {
            debug!("ignoring FLOW, relay is stopped");
            return;
        }
        debug!(
            con = receiver.connection_id(),
            link = receiver.link_id(),
            credit = sender.credit(),
            queued = sender.queued(),
            drain = sender.is_drain(),
            "received FLOW from downstream sender"
        );
        if sender.is_drain() {
            let deadline = self.config.drain_timeout();
            let sender = Arc::clone(sender);
            let receiver = Arc::clone(receiver);
            tokio::spawn(async move {
                match tokio::time::timeout(deadline, receiver.drain(deadline)).await {
                    Ok(Ok(())) => sender.drained(),
                    // an unsignalled drain is reconciled by the next FLOW
                    Ok(Err(error)) => debug!(%error, "upstream drain request failed"),
                    Err(_) => debug!(?deadline, "upstream drain request timed out"),
                }
            });
        } else {
            receiver.replenish(available_downstream_credit(sender.as_ref()));
        }
    }

    fn on_remote_close(&self) {
        if !self.state.lock().running {
            return;
        }
        let Some(connection) = self.connector.connection() else {
            return;
        };
        info!(
            container = ?connection.remote_container(),
            "connection to downstream container closed by peer"
        );
        connection.close();
    }
}

/// The only credit figure ever granted upstream: what the downstream
/// window still covers after the sender's local queue.
fn available_downstream_credit(sender: &dyn DownstreamSender) -> u32 {
    sender.credit().saturating_sub(sender.queued())
}

/// Builds a downstream sender for `receiver`: checks the connection is
/// open, rewrites the target address, requests the attach with the
/// policy's QoS, and disables automatic drain handling on the result.
async fn create_sender<P: ForwardingPolicy>(
    inner: &Arc<Inner<P>>,
    receiver: &Arc<dyn UpstreamReceiver>,
) -> Result<Arc<dyn DownstreamSender>, LinkError> {
    let connection = match inner.connector.connection() {
        Some(connection) if !connection.is_disconnected() => connection,
        _ => return Err(LinkError::ConnectionNotOpen),
    };
    let address = ResourceAddress::parse(receiver.target_address())?
        .downstream_address(inner.config.path_separator);
    let weak = Arc::downgrade(inner);
    let flow_receiver = Arc::clone(receiver);
    let on_flow: FlowHandler = Arc::new(move |sender: Arc<dyn DownstreamSender>| {
        if let Some(inner) = weak.upgrade() {
            inner.handle_flow(&sender, &flow_receiver);
        }
    });
    let sender = inner
        .sender_factory
        .open_sender(
            &connection,
            &address,
            inner.policy.downstream_qos(),
            on_flow,
        )
        .await?;
    // drain requests travel upstream and complete there first
    sender.set_auto_drained(false);
    Ok(sender)
}

async fn connect_to_downstream<P: ForwardingPolicy>(
    inner: &Arc<Inner<P>>,
) -> Result<Arc<dyn Connection>, ConnectError> {
    let options = inner.config.connect_options();
    let on_remote_close = remote_close_handler(Arc::downgrade(inner));
    let on_disconnect = disconnect_handler(Arc::downgrade(inner));
    inner
        .connector
        .connect(&options, on_remote_close, on_disconnect)
        .await
}

fn remote_close_handler<P: ForwardingPolicy>(inner: Weak<Inner<P>>) -> RemoteCloseHandler {
    Box::new(move || {
        if let Some(inner) = inner.upgrade() {
            inner.on_remote_close();
        }
    })
}

fn disconnect_handler<P: ForwardingPolicy>(inner: Weak<Inner<P>>) -> DisconnectHandler {
    Box::new(move |connection| {
        if let Some(inner) = inner.upgrade() {
            on_downstream_disconnect(&inner, connection);
        }
    })
}

/// Disconnect recovery: every downstream sender is bound to the defunct
/// connection and cannot be rebound, so all upstream receivers are closed
/// (producers reattach, which builds fresh senders) and a single reconnect
/// is scheduled.
fn on_downstream_disconnect<P: ForwardingPolicy>(
    inner: &Arc<Inner<P>>,
    connection: Arc<dyn Connection>,
) {
    let links = {
        let mut state = inner.state.lock();
        if !state.running {
            debug!("ignoring disconnect event, relay is stopped");
            return;
        }
        let links = state.registry.drain_all();
        if inner.config.reconnect_attempts != 0 && state.reconnect.is_none() {
            state.reconnect = Some(schedule_reconnect(inner));
        }
        links
    };
    warn!(
        container = ?connection.remote_container(),
        receivers = links.len(),
        "lost connection to downstream container, closing upstream receivers"
    );
    inner.metrics.record_downstream_disconnect();
    for (receiver, _) in &links {
        receiver.close(&conditions::NO_DOWNSTREAM_CONSUMER);
    }
    connection.detach_handlers();
    connection.disconnect();
    inner.connector.forget(&connection);
}

fn schedule_reconnect<P: ForwardingPolicy>(inner: &Arc<Inner<P>>) -> JoinHandle<()> {
    let weak = Arc::downgrade(inner);
    tokio::spawn(async move {
        tokio::time::sleep(RECONNECT_DELAY).await;
        let Some(inner) = weak.upgrade() else {
            return;
        };
        {
            let mut state = inner.state.lock();
            state.reconnect = None;
            if !state.running {
                return;
            }
        }
        info!("attempting to re-connect to downstream container");
        inner.metrics.record_reconnect_attempt();
        // the connector logs a failed attempt
        let _ = connect_to_downstream(&inner).await;
    })
}
