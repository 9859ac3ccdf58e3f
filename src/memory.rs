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

//! In-memory implementations of the relay's collaborator traits.
//!
//! These stand in for the AMQP I/O layers on both sides of the relay.
//! They are deterministic and scriptable: tests can refuse connects,
//! inject disconnects and FLOW frames, script sender credit and delivery
//! outcomes, and observe every call the relay makes. The crate's own test
//! suite is built on them, and embedders can use them to test their server
//! layers without a running AMQP container.

use crate::config::ConnectOptions;
use crate::connection::{
    ConnectError, Connection, ConnectionFactory, DisconnectHandler, RemoteCloseHandler,
};
use crate::link::{
    Delivery, Disposition, DownstreamSender, ErrorCondition, LinkError, Message, OutcomeReceiver,
    Qos, UpstreamReceiver,
};
use crate::sender::{FlowHandler, SenderFactory};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::oneshot;

/// Produces [`MemoryConnection`]s and keeps every connection it made so
/// tests can inject lifecycle events.
pub struct MemoryConnectionFactory {
    name: String,
    host: String,
    port: u16,
    refuse: AtomicBool,
    connections: Mutex<Vec<Arc<MemoryConnection>>>,
}

impl MemoryConnectionFactory {
    /// Creates a factory for a fictitious local container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "memory-relay".to_string(),
            host: "localhost".to_string(),
            port: 5672,
            refuse: AtomicBool::new(false),
            connections: Mutex::new(Vec::new()),
        }
    }

    /// When set, every connect attempt fails with a refused connection.
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// The number of connections handed out so far.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// The most recently handed out connection.
    #[must_use]
    pub fn last_connection(&self) -> Option<Arc<MemoryConnection>> {
        self.connections.lock().last().cloned()
    }
}

impl Default for MemoryConnectionFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionFactory for MemoryConnectionFactory {
    async fn connect(
        &self,
        _options: &ConnectOptions,
        on_remote_close: RemoteCloseHandler,
        on_disconnect: DisconnectHandler,
    ) -> Result<Arc<dyn Connection>, ConnectError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(ConnectError::Failed {
                address: format!("{}:{}", self.host, self.port),
                reason: "connection refused".to_string(),
            });
        }
        let connection = Arc::new_cyclic(|me| MemoryConnection {
            me: me.clone(),
            disconnected: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            on_remote_close: Mutex::new(Some(on_remote_close)),
            on_disconnect: Mutex::new(Some(on_disconnect)),
        });
        self.connections.lock().push(Arc::clone(&connection));
        Ok(connection)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn port(&self) -> u16 {
        self.port
    }
}

/// An in-memory downstream connection.
///
/// Tests drive the lifecycle with [`fire_remote_close`] and
/// [`fire_disconnect`]; a graceful [`close`](Connection::close) reports a
/// disconnect the way a real transport teardown would.
///
/// [`fire_remote_close`]: MemoryConnection::fire_remote_close
/// [`fire_disconnect`]: MemoryConnection::fire_disconnect
pub struct MemoryConnection {
    me: Weak<MemoryConnection>,
    disconnected: AtomicBool,
    closed: AtomicBool,
    on_remote_close: Mutex<Option<RemoteCloseHandler>>,
    on_disconnect: Mutex<Option<DisconnectHandler>>,
}

impl MemoryConnection {
    /// Simulates the downstream container closing the connection. The
    /// registered remote-close handler runs at most once.
    pub fn fire_remote_close(&self) {
        let handler = self.on_remote_close.lock().take();
        if let Some(handler) = handler {
            handler();
        }
    }

    /// Simulates losing the transport. Marks the connection disconnected
    /// and runs the registered disconnect handler at most once.
    pub fn fire_disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
        let handler = self.on_disconnect.lock().take();
        if let (Some(handler), Some(me)) = (handler, self.me.upgrade()) {
            handler(me);
        }
    }

    /// Whether a graceful close was initiated.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Connection for MemoryConnection {
    fn remote_container(&self) -> Option<String> {
        Some("memory-container".to_string())
    }

    fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // the transport underneath a closed connection goes away
        self.fire_disconnect();
    }

    fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }

    fn detach_handlers(&self) {
        self.on_remote_close.lock().take();
        self.on_disconnect.lock().take();
    }
}

/// Produces [`MemorySender`]s and keeps every sender it made.
pub struct MemorySenderFactory {
    fail_reason: Mutex<Option<String>>,
    initial_credit: AtomicU32,
    senders: Mutex<Vec<Arc<MemorySender>>>,
}

impl MemorySenderFactory {
    /// Creates a factory whose senders start with zero credit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fail_reason: Mutex::new(None),
            initial_credit: AtomicU32::new(0),
            senders: Mutex::new(Vec::new()),
        }
    }

    /// Makes the next attach fail with the given reason.
    pub fn fail_next_attach(&self, reason: impl Into<String>) {
        *self.fail_reason.lock() = Some(reason.into());
    }

    /// Credit granted to newly created senders.
    pub fn set_initial_credit(&self, credit: u32) {
        self.initial_credit.store(credit, Ordering::SeqCst);
    }

    /// The number of senders handed out so far.
    #[must_use]
    pub fn sender_count(&self) -> usize {
        self.senders.lock().len()
    }

    /// The most recently handed out sender.
    #[must_use]
    pub fn last_sender(&self) -> Option<Arc<MemorySender>> {
        self.senders.lock().last().cloned()
    }
}

impl Default for MemorySenderFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SenderFactory for MemorySenderFactory {
    async fn open_sender(
        &self,
        _connection: &Arc<dyn Connection>,
        address: &str,
        qos: Qos,
        on_flow: FlowHandler,
    ) -> Result<Arc<dyn DownstreamSender>, LinkError> {
        if let Some(reason) = self.fail_reason.lock().take() {
            return Err(LinkError::SenderCreation { reason });
        }
        let sender = MemorySender::new(
            address,
            qos,
            Some(on_flow),
            self.initial_credit.load(Ordering::SeqCst),
        );
        self.senders.lock().push(Arc::clone(&sender));
        Ok(sender)
    }
}

/// An in-memory downstream sender link with scriptable credit, queue
/// depth, drain flag, and delivery outcomes.
pub struct MemorySender {
    me: Weak<MemorySender>,
    address: String,
    qos: Qos,
    credit: AtomicU32,
    queued: AtomicU32,
    drain: AtomicBool,
    open: AtomicBool,
    auto_drained: AtomicBool,
    drained_signals: AtomicU32,
    on_flow: Mutex<Option<FlowHandler>>,
    sent: Mutex<Vec<(Message, bool)>>,
    next_outcome: Mutex<Option<Disposition>>,
    hold_outcomes: AtomicBool,
    pending: Mutex<Vec<oneshot::Sender<Disposition>>>,
}

impl MemorySender {
    fn new(address: &str, qos: Qos, on_flow: Option<FlowHandler>, credit: u32) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            address: address.to_string(),
            qos,
            credit: AtomicU32::new(credit),
            queued: AtomicU32::new(0),
            drain: AtomicBool::new(false),
            open: AtomicBool::new(true),
            // real links handle drain automatically unless told otherwise
            auto_drained: AtomicBool::new(true),
            drained_signals: AtomicU32::new(0),
            on_flow: Mutex::new(on_flow),
            sent: Mutex::new(Vec::new()),
            next_outcome: Mutex::new(None),
            hold_outcomes: AtomicBool::new(false),
            pending: Mutex::new(Vec::new()),
        })
    }

    /// Creates a standalone sender with no flow handler and zero credit.
    #[must_use]
    pub fn detached(address: &str) -> Arc<Self> {
        Self::new(address, Qos::AtMostOnce, None, 0)
    }

    /// The address the sender was attached with.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The QoS the sender was attached with.
    #[must_use]
    pub fn qos(&self) -> Qos {
        self.qos
    }

    /// Scripts the downstream credit window.
    pub fn set_credit(&self, credit: u32) {
        self.credit.store(credit, Ordering::SeqCst);
    }

    /// Scripts the local queue depth.
    pub fn set_queued(&self, queued: u32) {
        self.queued.store(queued, Ordering::SeqCst);
    }

    /// Scripts the drain flag carried by the next FLOW.
    pub fn set_drain(&self, drain: bool) {
        self.drain.store(drain, Ordering::SeqCst);
    }

    /// Opens or closes the link from the remote side.
    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }

    /// Whether automatic drain handling is enabled.
    #[must_use]
    pub fn auto_drained(&self) -> bool {
        self.auto_drained.load(Ordering::SeqCst)
    }

    /// How many times `drained` was signalled.
    #[must_use]
    pub fn drained_signals(&self) -> u32 {
        self.drained_signals.load(Ordering::SeqCst)
    }

    /// Every message sent so far.
    #[must_use]
    pub fn sent_messages(&self) -> Vec<Message> {
        self.sent
            .lock()
            .iter()
            .map(|(message, _)| message.clone())
            .collect()
    }

    /// The number of messages sent so far.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Whether the most recent send was settled.
    #[must_use]
    pub fn last_send_settled(&self) -> Option<bool> {
        self.sent.lock().last().map(|(_, settled)| *settled)
    }

    /// Scripts the outcome reported for the next unsettled send.
    pub fn set_next_outcome(&self, outcome: Disposition) {
        *self.next_outcome.lock() = Some(outcome);
    }

    /// When set, unsettled sends stay pending until
    /// [`resolve_pending`](Self::resolve_pending) is called.
    pub fn hold_outcomes(&self, hold: bool) {
        self.hold_outcomes.store(hold, Ordering::SeqCst);
    }

    /// Resolves every held unsettled send with `outcome`.
    pub fn resolve_pending(&self, outcome: Disposition) {
        for tx in self.pending.lock().drain(..) {
            let _ = tx.send(outcome);
        }
    }

    /// Delivers a FLOW frame for this sender: runs the flow handler the
    /// relay registered at creation time.
    pub fn fire_flow(&self) {
        let handler = self.on_flow.lock().as_ref().map(Arc::clone);
        if let (Some(handler), Some(me)) = (handler, self.me.upgrade()) {
            handler(me);
        }
    }
}

impl DownstreamSender for MemorySender {
    fn credit(&self) -> u32 {
        self.credit.load(Ordering::SeqCst)
    }

    fn queued(&self) -> u32 {
        self.queued.load(Ordering::SeqCst)
    }

    fn is_drain(&self) -> bool {
        self.drain.load(Ordering::SeqCst)
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn set_auto_drained(&self, enabled: bool) {
        self.auto_drained.store(enabled, Ordering::SeqCst);
    }

    fn drained(&self) {
        self.drained_signals.fetch_add(1, Ordering::SeqCst);
        self.drain.store(false, Ordering::SeqCst);
        // drain relinquishes whatever credit was left
        self.credit.store(0, Ordering::SeqCst);
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn send(&self, message: Message, settled: bool) -> Result<OutcomeReceiver, LinkError> {
        if !self.is_open() {
            return Err(LinkError::SenderClosed);
        }
        self.sent.lock().push((message, settled));
        let credit = self.credit.load(Ordering::SeqCst);
        self.credit.store(credit.saturating_sub(1), Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        if settled {
            let _ = tx.send(Disposition::Accepted);
        } else if self.hold_outcomes.load(Ordering::SeqCst) {
            self.pending.lock().push(tx);
        } else {
            let outcome = self
                .next_outcome
                .lock()
                .take()
                .unwrap_or(Disposition::Accepted);
            let _ = tx.send(outcome);
        }
        Ok(rx)
    }
}

/// An in-memory upstream receiver recording every call the relay makes.
pub struct MemoryReceiver {
    connection_id: String,
    link_id: String,
    target_address: String,
    replenished: Mutex<Vec<u32>>,
    drain_requests: AtomicU32,
    drain_error: Mutex<Option<LinkError>>,
    drain_delay: Mutex<Option<Duration>>,
    closed: Mutex<Vec<ErrorCondition>>,
}

impl MemoryReceiver {
    /// Creates a receiver for the given identity and target address.
    #[must_use]
    pub fn new(
        connection_id: impl Into<String>,
        link_id: impl Into<String>,
        target_address: impl Into<String>,
    ) -> Self {
        Self {
            connection_id: connection_id.into(),
            link_id: link_id.into(),
            target_address: target_address.into(),
            replenished: Mutex::new(Vec::new()),
            drain_requests: AtomicU32::new(0),
            drain_error: Mutex::new(None),
            drain_delay: Mutex::new(None),
            closed: Mutex::new(Vec::new()),
        }
    }

    /// Every credit grant received, in order.
    #[must_use]
    pub fn replenished(&self) -> Vec<u32> {
        self.replenished.lock().clone()
    }

    /// The most recent credit grant.
    #[must_use]
    pub fn last_replenished(&self) -> Option<u32> {
        self.replenished.lock().last().copied()
    }

    /// How many drain requests were forwarded to this receiver.
    #[must_use]
    pub fn drain_requests(&self) -> u32 {
        self.drain_requests.load(Ordering::SeqCst)
    }

    /// Makes the next drain request fail with `error`.
    pub fn fail_next_drain(&self, error: LinkError) {
        *self.drain_error.lock() = Some(error);
    }

    /// Delays drain completion, e.g. past the relay's deadline.
    pub fn delay_drain(&self, delay: Duration) {
        *self.drain_delay.lock() = Some(delay);
    }

    /// Every error condition this receiver was closed with, in order.
    #[must_use]
    pub fn close_conditions(&self) -> Vec<ErrorCondition> {
        self.closed.lock().clone()
    }

    /// The most recent close condition, if the receiver was closed.
    #[must_use]
    pub fn closed_with(&self) -> Option<ErrorCondition> {
        self.closed.lock().last().copied()
    }
}

#[async_trait]
impl UpstreamReceiver for MemoryReceiver {
    fn connection_id(&self) -> &str {
        &self.connection_id
    }

    fn link_id(&self) -> &str {
        &self.link_id
    }

    fn target_address(&self) -> &str {
        &self.target_address
    }

    fn replenish(&self, credits: u32) {
        self.replenished.lock().push(credits);
    }

    async fn drain(&self, _timeout: Duration) -> Result<(), LinkError> {
        self.drain_requests.fetch_add(1, Ordering::SeqCst);
        let delay = *self.drain_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.drain_error.lock().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn close(&self, condition: &ErrorCondition) {
        self.closed.lock().push(*condition);
    }
}

/// An in-memory delivery handle. Clones share the recorded outcome, so a
/// test can keep one clone and hand the other to the relay.
#[derive(Clone)]
pub struct MemoryDelivery {
    remotely_settled: bool,
    outcome: Arc<Mutex<Option<Disposition>>>,
}

impl MemoryDelivery {
    /// A delivery the producer settled at send time.
    #[must_use]
    pub fn settled() -> Self {
        Self {
            remotely_settled: true,
            outcome: Arc::new(Mutex::new(None)),
        }
    }

    /// A delivery awaiting a disposition.
    #[must_use]
    pub fn unsettled() -> Self {
        Self {
            remotely_settled: false,
            outcome: Arc::new(Mutex::new(None)),
        }
    }

    /// The outcome the relay settled this delivery with, if any.
    #[must_use]
    pub fn outcome(&self) -> Option<Disposition> {
        *self.outcome.lock()
    }
}

impl Delivery for MemoryDelivery {
    fn remotely_settled(&self) -> bool {
        self.remotely_settled
    }

    fn settle(&self, outcome: Disposition) {
        *self.outcome.lock() = Some(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_factory_refuses_when_told() {
        let factory = MemoryConnectionFactory::new();
        factory.refuse_connections(true);
        let result = factory
            .connect(&ConnectOptions::default(), Box::new(|| {}), Box::new(|_| {}))
            .await;
        assert!(matches!(result, Err(ConnectError::Failed { .. })));
        assert_eq!(factory.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_handler_runs_once() {
        let factory = MemoryConnectionFactory::new();
        let fired = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&fired);
        factory
            .connect(
                &ConnectOptions::default(),
                Box::new(|| {}),
                Box::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await
            .unwrap();

        let connection = factory.last_connection().unwrap();
        connection.fire_disconnect();
        connection.fire_disconnect();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(connection.is_disconnected());
    }

    #[tokio::test]
    async fn test_close_reports_disconnect_unless_detached() {
        let factory = MemoryConnectionFactory::new();
        let fired = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&fired);
        factory
            .connect(
                &ConnectOptions::default(),
                Box::new(|| {}),
                Box::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await
            .unwrap();

        let connection = factory.last_connection().unwrap();
        connection.detach_handlers();
        connection.close();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(connection.is_closed());
    }

    #[test]
    fn test_sender_send_records_and_decrements_credit() {
        let sender = MemorySender::detached("telemetry/t1");
        sender.set_credit(2);

        sender.send(Message::new(b"a".to_vec()), true).unwrap();
        assert_eq!(sender.credit(), 1);
        assert_eq!(sender.sent_count(), 1);
        assert_eq!(sender.last_send_settled(), Some(true));
    }

    #[test]
    fn test_sender_send_fails_when_closed() {
        let sender = MemorySender::detached("telemetry/t1");
        sender.set_open(false);
        let result = sender.send(Message::new(Vec::new()), true);
        assert!(matches!(result, Err(LinkError::SenderClosed)));
    }

    #[tokio::test]
    async fn test_settled_send_resolves_accepted() {
        let sender = MemorySender::detached("telemetry/t1");
        sender.set_credit(1);
        let outcome = sender.send(Message::new(Vec::new()), true).unwrap();
        assert_eq!(outcome.await.unwrap(), Disposition::Accepted);
    }

    #[tokio::test]
    async fn test_held_outcome_resolves_later() {
        let sender = MemorySender::detached("event/t1");
        sender.set_credit(1);
        sender.hold_outcomes(true);
        let outcome = sender.send(Message::new(Vec::new()), false).unwrap();
        sender.resolve_pending(Disposition::Released);
        assert_eq!(outcome.await.unwrap(), Disposition::Released);
    }

    #[test]
    fn test_delivery_clones_share_outcome() {
        let delivery = MemoryDelivery::unsettled();
        let observer = delivery.clone();
        delivery.settle(Disposition::Accepted);
        assert_eq!(observer.outcome(), Some(Disposition::Accepted));
    }
}
