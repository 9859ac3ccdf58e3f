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

//! Traits at the engine's two seams: the server layer above and the
//! message-kind policy below.

use crate::error::RelayError;
use crate::link::{Delivery, DownstreamSender, Message, Qos, UpstreamReceiver};
use async_trait::async_trait;
use std::sync::Arc;

/// The operations the upstream server layer invokes on the relay.
///
/// All operations other than `start` fail with [`RelayError::NotStarted`]
/// while the relay is not running.
#[async_trait]
pub trait DownstreamAdapter: Send + Sync {
    /// Starts the relay and connects to the downstream container.
    ///
    /// When `wait_for_downstream_connection` is set the future completes
    /// only after the first successful connect; otherwise it completes
    /// immediately and the connection is established in the background.
    /// Idempotent while running.
    ///
    /// # Errors
    ///
    /// In wait mode, returns the connect failure.
    async fn start(&self) -> Result<(), RelayError>;

    /// Stops the relay: cancels a pending reconnect, closes the
    /// downstream connection, and rejects further operations. Idempotent.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the rest of the trait.
    async fn stop(&self) -> Result<(), RelayError>;

    /// Ensures `receiver` has a live downstream sender, creating one if
    /// none is registered or the registered one is no longer open.
    ///
    /// # Errors
    ///
    /// Returns a [`LinkError`](crate::LinkError) when the downstream
    /// connection is not open, the target address is invalid, or the
    /// attach fails. Any partial registry state is removed first.
    async fn on_client_attach(&self, receiver: Arc<dyn UpstreamReceiver>)
        -> Result<(), RelayError>;

    /// Releases all state kept for `receiver`, closing its downstream
    /// sender if still open. Idempotent.
    ///
    /// # Errors
    ///
    /// Fails only with [`RelayError::NotStarted`].
    fn on_client_detach(&self, receiver: &dyn UpstreamReceiver) -> Result<(), RelayError>;

    /// Releases all state kept for every receiver of an upstream
    /// connection, closing their downstream senders. Idempotent.
    ///
    /// # Errors
    ///
    /// Fails only with [`RelayError::NotStarted`].
    fn on_client_disconnect(&self, connection_id: &str) -> Result<(), RelayError>;

    /// Forwards a message arriving on `receiver`.
    ///
    /// Depending on the downstream sender's state the message is
    /// forwarded, released, or discarded; a receiver without a usable
    /// sender is closed with
    /// [`NO_DOWNSTREAM_CONSUMER`](crate::link::conditions::NO_DOWNSTREAM_CONSUMER).
    ///
    /// # Errors
    ///
    /// Fails only with [`RelayError::NotStarted`]; per-message problems
    /// are reported through the delivery's disposition.
    fn process_message(
        &self,
        receiver: &dyn UpstreamReceiver,
        delivery: Box<dyn Delivery>,
        message: Message,
    ) -> Result<(), RelayError>;
}

/// Decides how messages travel downstream and how deliveries are settled
/// upstream.
///
/// The engine consults the policy twice: once at sender creation time for
/// the link QoS and once per forwarded message. Implementations must not
/// block; the disposition mirror of an unsettled send happens on a
/// separate task.
pub trait ForwardingPolicy: Send + Sync + 'static {
    /// The QoS requested for downstream sender links.
    fn downstream_qos(&self) -> Qos;

    /// Sends `message` on `sender` and settles `delivery` with the
    /// producer. Only called when the sender is open and has credit.
    fn forward_message(
        &self,
        sender: &Arc<dyn DownstreamSender>,
        message: Message,
        delivery: Box<dyn Delivery>,
    );
}
