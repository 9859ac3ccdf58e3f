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

//! Error types for the link layer.

use crate::address::AddressError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in the link layer.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The downstream connection is absent or disconnected.
    ///
    /// Sender creation requires an open connection. This is transient:
    /// the caller typically closes the upstream link and the producer
    /// reattaches once the downstream container is reachable.
    #[error("downstream connection must be open before creating a sender")]
    ConnectionNotOpen,

    /// The upstream target address could not be rewritten for the
    /// downstream attach.
    #[error("invalid target address: {0}")]
    Address(#[from] AddressError),

    /// The downstream container refused or failed the sender attach.
    #[error("failed to create downstream sender: {reason}")]
    SenderCreation {
        /// Description of the failure.
        reason: String,
    },

    /// The sender link is no longer usable.
    #[error("downstream sender is not open")]
    SenderClosed,

    /// An upstream drain request did not complete in time.
    #[error("drain request did not complete within {timeout:?}")]
    DrainTimeout {
        /// The deadline that was exceeded.
        timeout: Duration,
    },
}

impl LinkError {
    /// Returns true if the operation may succeed when retried later.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionNotOpen | Self::SenderCreation { .. } | Self::DrainTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverability() {
        assert!(LinkError::ConnectionNotOpen.is_recoverable());
        assert!(LinkError::SenderCreation {
            reason: "attach refused".to_string()
        }
        .is_recoverable());
        assert!(!LinkError::SenderClosed.is_recoverable());
        assert!(!LinkError::Address(AddressError::MissingSegments {
            address: "telemetry".to_string()
        })
        .is_recoverable());
    }

    #[test]
    fn test_address_error_source_chains() {
        use std::error::Error as _;
        let error = LinkError::from(AddressError::MissingSegments {
            address: "telemetry".to_string(),
        });
        assert!(error.source().is_some());
    }
}
