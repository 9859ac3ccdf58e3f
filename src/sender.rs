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

//! The downstream sender factory seam.
//!
//! The relay asks a [`SenderFactory`] for a new outbound link whenever an
//! upstream receiver attaches without a usable sender. The factory is the
//! raw attach operation implemented by the AMQP client layer; the relay
//! performs the surrounding contract itself (connection liveness check,
//! address rewriting, disabling automatic drain handling).

use crate::connection::Connection;
use crate::link::{DownstreamSender, LinkError, Qos};
use async_trait::async_trait;
use std::sync::Arc;

/// Invoked whenever the downstream container sends a FLOW frame for a
/// sender, with the sender whose credit window changed.
pub type FlowHandler = Arc<dyn Fn(Arc<dyn DownstreamSender>) + Send + Sync>;

/// Creates outbound sender links on a downstream connection.
#[async_trait]
pub trait SenderFactory: Send + Sync {
    /// Attaches a sender link for `address` with the requested QoS and
    /// registers `on_flow` as the handler for downstream FLOW frames.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::SenderCreation`] when the downstream container
    /// refuses or fails the attach.
    async fn open_sender(
        &self,
        connection: &Arc<dyn Connection>,
        address: &str,
        qos: Qos,
        on_flow: FlowHandler,
    ) -> Result<Arc<dyn DownstreamSender>, LinkError>;
}
