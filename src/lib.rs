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

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! # Design
//!
//! The relay is deliberately narrow: it owns no wire protocol, no
//! listener, and no message content. It is the state machine between two
//! AMQP I/O layers reached through traits:
//!
//! - [`ConnectionFactory`] and [`SenderFactory`] are implemented by the
//!   downstream AMQP client layer.
//! - [`UpstreamReceiver`] and [`Delivery`] are implemented by the upstream
//!   server layer, which announces link lifecycle events and incoming
//!   messages through the [`DownstreamAdapter`] operations.
//!
//! The engine's invariants are what make it interesting:
//!
//! - a receiver has at most one downstream sender, tracked in a registry
//!   that is consistent after every operation
//! - credit granted upstream never exceeds the downstream window minus
//!   locally queued messages
//! - a lost downstream connection atomically invalidates every sender,
//!   closes every upstream receiver, and schedules exactly one reconnect

pub mod adapter;
pub mod address;
pub mod config;
pub mod connection;
pub mod error;
pub mod link;
pub mod memory;
pub mod observability;
pub mod sender;

pub use adapter::{DownstreamAdapter, EventPolicy, ForwardingPolicy, ForwardingRelay, TelemetryPolicy};
pub use address::{AddressError, ResourceAddress, DEFAULT_PATH_SEPARATOR};
pub use config::{ConnectOptions, RelayConfig};
pub use connection::{
    ConnectError, Connection, ConnectionFactory, DisconnectHandler, DownstreamConnector,
    RemoteCloseHandler,
};
pub use error::RelayError;
pub use link::{
    conditions, Delivery, Disposition, DownstreamSender, ErrorCondition, LinkError, LinkKey,
    LinkRegistry, Message, OutcomeReceiver, Qos, SenderHandle, UpstreamReceiver,
};
pub use observability::RelayMetrics;
pub use sender::{FlowHandler, SenderFactory};
