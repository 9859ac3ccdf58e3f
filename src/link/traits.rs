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

//! Core link traits and message types.

use crate::link::conditions::ErrorCondition;
use crate::link::error::LinkError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::oneshot;

/// The outcome of a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// The message was accepted by its receiver.
    Accepted,
    /// The message was not processed; the sender may retry.
    Released,
    /// The message was rejected as unprocessable.
    Rejected,
}

/// Quality of service requested for a downstream sender link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Qos {
    /// Deliveries are settled at send time (fire and forget).
    AtMostOnce,
    /// Deliveries are settled once the peer reports a disposition.
    AtLeastOnce,
}

/// An AMQP 1.0 message as seen by the relay.
///
/// The relay performs no content inspection; the payload is opaque. The
/// metadata fields exist because they appear in forwarding logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// The message-id property, if set.
    pub message_id: Option<String>,
    /// The to/address property, if set.
    pub address: Option<String>,
    /// The content-type property, if set.
    pub content_type: Option<String>,
    /// The raw message body.
    pub payload: Vec<u8>,
}

impl Message {
    /// Creates a message with the given payload and no metadata.
    #[must_use]
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            payload,
            ..Default::default()
        }
    }

    /// Sets the message-id property.
    #[must_use]
    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// Sets the address property.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Sets the content-type property.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Resolves with the remote outcome of an unsettled send.
///
/// For settled sends the receiver resolves immediately with
/// [`Disposition::Accepted`].
pub type OutcomeReceiver = oneshot::Receiver<Disposition>;

/// The server-side inbound link from an upstream producer.
///
/// Implemented by the upstream server layer; the relay holds a non-owning
/// reference keyed into the [`LinkRegistry`](crate::LinkRegistry).
#[async_trait]
pub trait UpstreamReceiver: Send + Sync {
    /// Identifies the underlying upstream connection. Stable for the
    /// lifetime of that connection and shared by all of its links.
    fn connection_id(&self) -> &str;

    /// Identifies this link within its connection.
    fn link_id(&self) -> &str;

    /// The AMQP target address the producer attached to.
    fn target_address(&self) -> &str;

    /// Grants `credits` more message credits to the producer.
    fn replenish(&self, credits: u32);

    /// Asks the producer to use up or return its remaining credit.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::DrainTimeout`] when the producer does not
    /// complete the drain within `timeout`.
    async fn drain(&self, timeout: Duration) -> Result<(), LinkError>;

    /// Closes the link, reporting `condition` to the producer.
    fn close(&self, condition: &ErrorCondition);
}

/// The outbound link to the downstream container.
///
/// Implemented by the downstream AMQP client layer and handed to the relay
/// by a [`SenderFactory`](crate::SenderFactory).
pub trait DownstreamSender: Send + Sync {
    /// Message credits currently granted by the downstream container.
    fn credit(&self) -> u32;

    /// Messages buffered locally, awaiting transmission.
    fn queued(&self) -> u32;

    /// Whether the downstream container has requested a drain.
    fn is_drain(&self) -> bool;

    /// Whether the link is open on both ends.
    fn is_open(&self) -> bool;

    /// Controls automatic drain handling. The relay disables this on every
    /// sender it creates: drain requests must travel upstream and complete
    /// there before the downstream side is signalled.
    fn set_auto_drained(&self, enabled: bool);

    /// Signals drain completion to the downstream container.
    fn drained(&self);

    /// Closes the link.
    fn close(&self);

    /// Dispatches a message onto the link.
    ///
    /// The message is enqueued synchronously, so calls made in order are
    /// transmitted in order. The returned [`OutcomeReceiver`] resolves
    /// with the remote disposition; for `settled` sends it resolves
    /// immediately with [`Disposition::Accepted`].
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::SenderClosed`] when the link is no longer
    /// usable.
    fn send(&self, message: Message, settled: bool) -> Result<OutcomeReceiver, LinkError>;
}

/// Per-message handle used to settle an outcome with the producer.
pub trait Delivery: Send + Sync {
    /// Whether the producer sent the message pre-settled (at-most-once).
    fn remotely_settled(&self) -> bool;

    /// Settles the delivery with the given outcome.
    fn settle(&self, outcome: Disposition);
}
