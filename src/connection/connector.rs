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

//! Ownership of the single downstream connection.

use crate::config::ConnectOptions;
use crate::connection::error::ConnectError;
use crate::connection::traits::{
    Connection, ConnectionFactory, DisconnectHandler, RemoteCloseHandler,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Maintains at most one active connection to the downstream container.
///
/// The connector stores the handle produced by the factory, answers
/// liveness queries, and performs the graceful close used by `stop`. It
/// holds no engine state; the relay decides when to connect, forget, and
/// close.
pub struct DownstreamConnector {
    factory: Arc<dyn ConnectionFactory>,
    current: Mutex<Option<Arc<dyn Connection>>>,
}

impl DownstreamConnector {
    /// Creates a connector that obtains connections from `factory`.
    #[must_use]
    pub fn new(factory: Arc<dyn ConnectionFactory>) -> Self {
        Self {
            factory,
            current: Mutex::new(None),
        }
    }

    /// Connects to the downstream container and stores the handle.
    ///
    /// # Errors
    ///
    /// Returns the factory's [`ConnectError`] when no connection could be
    /// established.
    pub async fn connect(
        &self,
        options: &ConnectOptions,
        on_remote_close: RemoteCloseHandler,
        on_disconnect: DisconnectHandler,
    ) -> Result<Arc<dyn Connection>, ConnectError> {
        match self
            .factory
            .connect(options, on_remote_close, on_disconnect)
            .await
        {
            Ok(connection) => {
                info!(
                    host = self.factory.host(),
                    port = self.factory.port(),
                    container = ?connection.remote_container(),
                    "connected to downstream container"
                );
                *self.current.lock() = Some(Arc::clone(&connection));
                Ok(connection)
            }
            Err(error) => {
                info!(
                    host = self.factory.host(),
                    port = self.factory.port(),
                    %error,
                    "failed to connect to downstream container"
                );
                Err(error)
            }
        }
    }

    /// The current connection handle, if any.
    #[must_use]
    pub fn connection(&self) -> Option<Arc<dyn Connection>> {
        self.current.lock().clone()
    }

    /// Whether a connection exists and is not disconnected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .is_some_and(|connection| !connection.is_disconnected())
    }

    /// Clears the stored handle if it still refers to `connection`.
    ///
    /// Used by the disconnect recovery path so a reconnect racing with a
    /// late disconnect event cannot drop the fresh connection.
    pub fn forget(&self, connection: &Arc<dyn Connection>) {
        let mut current = self.current.lock();
        if let Some(existing) = current.as_ref() {
            if Arc::ptr_eq(existing, connection) {
                *current = None;
            }
        }
    }

    /// Gracefully closes the current connection, detaching its lifecycle
    /// handlers first so the close raises no disconnect event. Idempotent.
    pub fn close(&self) {
        let connection = self.current.lock().take();
        match connection {
            Some(connection) if !connection.is_disconnected() => {
                info!(
                    container = ?connection.remote_container(),
                    "closing connection to downstream container"
                );
                connection.detach_handlers();
                connection.close();
            }
            _ => debug!("downstream connection already closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryConnectionFactory;

    fn noop_handlers() -> (RemoteCloseHandler, DisconnectHandler) {
        (Box::new(|| {}), Box::new(|_| {}))
    }

    #[tokio::test]
    async fn test_connect_stores_handle() {
        let factory = Arc::new(MemoryConnectionFactory::new());
        let connector = DownstreamConnector::new(factory.clone());
        assert!(!connector.is_connected());

        let (on_close, on_disconnect) = noop_handlers();
        connector
            .connect(&ConnectOptions::default(), on_close, on_disconnect)
            .await
            .unwrap();
        assert!(connector.is_connected());
        assert_eq!(factory.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_leaves_no_handle() {
        let factory = Arc::new(MemoryConnectionFactory::new());
        factory.refuse_connections(true);
        let connector = DownstreamConnector::new(factory);

        let (on_close, on_disconnect) = noop_handlers();
        let result = connector
            .connect(&ConnectOptions::default(), on_close, on_disconnect)
            .await;
        assert!(result.is_err());
        assert!(!connector.is_connected());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let factory = Arc::new(MemoryConnectionFactory::new());
        let connector = DownstreamConnector::new(factory);

        let (on_close, on_disconnect) = noop_handlers();
        connector
            .connect(&ConnectOptions::default(), on_close, on_disconnect)
            .await
            .unwrap();

        connector.close();
        assert!(!connector.is_connected());
        connector.close();
    }

    #[tokio::test]
    async fn test_forget_only_clears_matching_handle() {
        let factory = Arc::new(MemoryConnectionFactory::new());
        let connector = DownstreamConnector::new(factory);

        let (on_close, on_disconnect) = noop_handlers();
        let first = connector
            .connect(&ConnectOptions::default(), on_close, on_disconnect)
            .await
            .unwrap();

        let (on_close, on_disconnect) = noop_handlers();
        let second = connector
            .connect(&ConnectOptions::default(), on_close, on_disconnect)
            .await
            .unwrap();

        // A late disconnect for the first connection must not drop the
        // fresh one.
        connector.forget(&first);
        assert!(connector.is_connected());
        connector.forget(&second);
        assert!(!connector.is_connected());
    }
}
