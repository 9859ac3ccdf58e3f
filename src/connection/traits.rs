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

//! Connection traits implemented by the downstream AMQP client layer.

use crate::config::ConnectOptions;
use crate::connection::error::ConnectError;
use async_trait::async_trait;
use std::sync::Arc;

/// Invoked when the downstream container closes the connection remotely.
pub type RemoteCloseHandler = Box<dyn Fn() + Send + Sync>;

/// Invoked when the transport underneath a connection is lost. Receives
/// the defunct connection so the handler can detach and dispose of it.
pub type DisconnectHandler = Box<dyn Fn(Arc<dyn Connection>) + Send + Sync>;

/// An open connection to the downstream container.
pub trait Connection: Send + Sync {
    /// The container name announced by the downstream peer, if known.
    fn remote_container(&self) -> Option<String>;

    /// Whether the underlying transport is gone.
    fn is_disconnected(&self) -> bool;

    /// Initiates a graceful close. Idempotent.
    fn close(&self);

    /// Drops the transport without a close handshake.
    fn disconnect(&self);

    /// Detaches the close and disconnect handlers registered at connect
    /// time, so a connection being disposed of raises no further events.
    fn detach_handlers(&self);
}

/// Creates connections to the downstream container.
///
/// Implementations apply the [`ConnectOptions`] themselves: the connect
/// timeout bounds each attempt and the reconnect attempts/interval drive
/// the factory's initial-connect retry loop. The relay only schedules its
/// own reconnect after an established connection is lost.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Attempts to connect, registering the given lifecycle handlers on
    /// the resulting connection.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectError`] when no connection could be established
    /// within the bounds of `options`.
    async fn connect(
        &self,
        options: &ConnectOptions,
        on_remote_close: RemoteCloseHandler,
        on_disconnect: DisconnectHandler,
    ) -> Result<Arc<dyn Connection>, ConnectError>;

    /// The container name this factory announces on open.
    fn name(&self) -> &str;

    /// The downstream host.
    fn host(&self) -> &str;

    /// The downstream port.
    fn port(&self) -> u16;
}
