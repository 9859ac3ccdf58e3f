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

//! Link layer shared between the relay and the upstream server layer.
//!
//! The relay never talks AMQP itself; it coordinates two kinds of links
//! owned by the I/O layers on either side:
//!
//! - [`UpstreamReceiver`]: the server-side inbound link from a producer.
//!   The relay holds a non-owning reference and uses it to grant credit,
//!   forward drain requests, and close the link with an AMQP error
//!   condition.
//! - [`DownstreamSender`]: the outbound link to the downstream container,
//!   created through a [`SenderFactory`](crate::SenderFactory). The relay
//!   reads its credit window and dispatches messages onto it.
//!
//! Each message arrives with a [`Delivery`] handle used to settle the
//! outcome ([`Disposition`]) back to the producer. The pairing of
//! receivers and senders lives in the [`LinkRegistry`].

pub mod conditions;
mod error;
mod key;
mod registry;
mod traits;

pub use conditions::ErrorCondition;
pub use error::LinkError;
pub use key::{LinkKey, SenderHandle};
pub use registry::LinkRegistry;
pub use traits::{
    Delivery, Disposition, DownstreamSender, Message, OutcomeReceiver, Qos, UpstreamReceiver,
};
