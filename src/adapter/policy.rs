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

//! The two message-kind policies: telemetry and event.

use crate::adapter::traits::ForwardingPolicy;
use crate::link::{Delivery, Disposition, DownstreamSender, Message, Qos};
use std::sync::Arc;
use tracing::debug;

/// At-most-once forwarding for telemetry data.
///
/// Messages are sent pre-settled downstream and the upstream delivery is
/// accepted immediately. A message lost after that point stays lost, which
/// is the telemetry contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct TelemetryPolicy;

impl ForwardingPolicy for TelemetryPolicy {
    fn downstream_qos(&self) -> Qos {
        Qos::AtMostOnce
    }

    fn forward_message(
        &self,
        sender: &Arc<dyn DownstreamSender>,
        message: Message,
        delivery: Box<dyn Delivery>,
    ) {
        if let Err(error) = sender.send(message, true) {
            debug!(%error, "failed to dispatch pre-settled message downstream");
        }
        delivery.settle(Disposition::Accepted);
    }
}

/// At-least-once forwarding for events.
///
/// Messages are sent unsettled downstream; the disposition reported by the
/// downstream container is mirrored upstream once it arrives. A failed
/// dispatch releases the delivery so the producer retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventPolicy;

impl ForwardingPolicy for EventPolicy {
    fn downstream_qos(&self) -> Qos {
        Qos::AtLeastOnce
    }

    fn forward_message(
        &self,
        sender: &Arc<dyn DownstreamSender>,
        message: Message,
        delivery: Box<dyn Delivery>,
    ) {
        match sender.send(message, false) {
            Ok(outcome) => {
                tokio::spawn(async move {
                    // A dropped outcome means the link died before the
                    // container reported back; release so the producer
                    // retries.
                    let disposition = outcome.await.unwrap_or(Disposition::Released);
                    delivery.settle(disposition);
                });
            }
            Err(error) => {
                debug!(%error, "failed to dispatch message downstream, releasing delivery");
                delivery.settle(Disposition::Released);
            }
        }
    }
}
