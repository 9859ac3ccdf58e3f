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

//! Error types for the connection layer.

use std::time::Duration;
use thiserror::Error;

/// Errors raised while connecting to the downstream container.
///
/// All connection errors are transient: the downstream container may come
/// back, so callers either retry (the relay's reconnect path) or surface
/// the failure and let the embedder decide.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The connection attempt failed.
    #[error("failed to connect to downstream container at {address}: {reason}")]
    Failed {
        /// The downstream address.
        address: String,
        /// Description of the failure.
        reason: String,
    },

    /// The connection attempt did not complete in time.
    #[error("connect attempt timed out after {timeout:?}")]
    Timeout {
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// The connection was lost while the operation was in flight.
    #[error("downstream connection is disconnected")]
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let error = ConnectError::Failed {
            address: "localhost:5672".to_string(),
            reason: "connection refused".to_string(),
        };
        let rendered = error.to_string();
        assert!(rendered.contains("localhost:5672"));
        assert!(rendered.contains("connection refused"));
    }
}
