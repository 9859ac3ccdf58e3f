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

//! Downstream connection lifecycle.
//!
//! The relay maintains at most one connection to the downstream container,
//! obtained through a [`ConnectionFactory`] implemented by the AMQP client
//! layer. The [`DownstreamConnector`] owns the current handle; the relay
//! registers close and disconnect callbacks so a lost connection triggers
//! the disconnect recovery procedure.

mod connector;
mod error;
mod traits;

pub use connector::DownstreamConnector;
pub use error::ConnectError;
pub use traits::{Connection, ConnectionFactory, DisconnectHandler, RemoteCloseHandler};
