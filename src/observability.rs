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

//! Counters describing relay activity.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics recorded by a [`ForwardingRelay`](crate::ForwardingRelay).
///
/// Counters are atomic and monotonically increasing; read them at any time
/// from any thread.
///
/// # Examples
///
/// ```rust
/// use amqp_relay::RelayMetrics;
///
/// let metrics = RelayMetrics::new();
/// metrics.record_message_forwarded();
/// assert_eq!(metrics.messages_forwarded(), 1);
/// ```
#[derive(Debug, Default)]
pub struct RelayMetrics {
    messages_forwarded: AtomicU64,
    messages_released: AtomicU64,
    messages_discarded: AtomicU64,
    senders_created: AtomicU64,
    senders_closed: AtomicU64,
    downstream_disconnects: AtomicU64,
    reconnect_attempts: AtomicU64,
}

impl RelayMetrics {
    /// Creates a new metrics tracker with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message handed to a downstream sender.
    pub fn record_message_forwarded(&self) {
        self.messages_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an unsettled message released back to its producer for
    /// lack of downstream credit.
    pub fn record_message_released(&self) {
        self.messages_released.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a message discarded outright: pre-settled with no credit,
    /// or arriving without a usable downstream sender.
    pub fn record_message_discarded(&self) {
        self.messages_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a downstream sender created for an upstream receiver.
    pub fn record_sender_created(&self) {
        self.senders_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a downstream sender closed by the relay.
    pub fn record_sender_closed(&self) {
        self.senders_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an unexpected loss of the downstream connection.
    pub fn record_downstream_disconnect(&self) {
        self.downstream_disconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a reconnect attempt scheduled after a disconnect.
    pub fn record_reconnect_attempt(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Total messages handed to downstream senders.
    #[must_use]
    pub fn messages_forwarded(&self) -> u64 {
        self.messages_forwarded.load(Ordering::Relaxed)
    }

    /// Total messages released back to producers.
    #[must_use]
    pub fn messages_released(&self) -> u64 {
        self.messages_released.load(Ordering::Relaxed)
    }

    /// Total messages discarded.
    #[must_use]
    pub fn messages_discarded(&self) -> u64 {
        self.messages_discarded.load(Ordering::Relaxed)
    }

    /// Total downstream senders created.
    #[must_use]
    pub fn senders_created(&self) -> u64 {
        self.senders_created.load(Ordering::Relaxed)
    }

    /// Total downstream senders closed by the relay.
    #[must_use]
    pub fn senders_closed(&self) -> u64 {
        self.senders_closed.load(Ordering::Relaxed)
    }

    /// Total unexpected downstream disconnects observed.
    #[must_use]
    pub fn downstream_disconnects(&self) -> u64 {
        self.downstream_disconnects.load(Ordering::Relaxed)
    }

    /// Total reconnect attempts made after disconnects.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u64 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let metrics = RelayMetrics::new();
        assert_eq!(metrics.messages_forwarded(), 0);
        assert_eq!(metrics.messages_released(), 0);
        assert_eq!(metrics.messages_discarded(), 0);
        assert_eq!(metrics.senders_created(), 0);
        assert_eq!(metrics.senders_closed(), 0);
        assert_eq!(metrics.downstream_disconnects(), 0);
        assert_eq!(metrics.reconnect_attempts(), 0);
    }

    #[test]
    fn test_counters_accumulate() {
        let metrics = RelayMetrics::new();
        metrics.record_message_forwarded();
        metrics.record_message_forwarded();
        metrics.record_message_released();
        metrics.record_sender_created();
        metrics.record_sender_closed();
        metrics.record_downstream_disconnect();
        metrics.record_reconnect_attempt();

        assert_eq!(metrics.messages_forwarded(), 2);
        assert_eq!(metrics.messages_released(), 1);
        assert_eq!(metrics.senders_created(), 1);
        assert_eq!(metrics.senders_closed(), 1);
        assert_eq!(metrics.downstream_disconnects(), 1);
        assert_eq!(metrics.reconnect_attempts(), 1);
    }
}
