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

//! Top-level error type for the relay.
//!
//! Errors are layered the same way the crate is: connection-level failures
//! ([`ConnectError`]) affect the downstream connection as a whole,
//! link-level failures ([`LinkError`]) affect a single sender link, and
//! [`RelayError`] composes both with the lifecycle violations only the
//! engine itself can raise.

use crate::connection::ConnectError;
use crate::link::LinkError;
use thiserror::Error;

/// Errors returned by the public operations of a forwarding relay.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A public operation other than `start` was invoked while the relay
    /// is not running. This is a programming error in the caller.
    #[error("relay must be started first")]
    NotStarted,

    /// A connection-layer error occurred.
    #[error("connection error: {0}")]
    Connect(#[from] ConnectError),

    /// A link-layer error occurred.
    #[error("link error: {0}")]
    Link(#[from] LinkError),
}

impl RelayError {
    /// Returns true if this error is potentially recoverable.
    ///
    /// Connection errors are always transient. Lifecycle violations are
    /// not recoverable without caller intervention.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::NotStarted => false,
            Self::Connect(_) => true,
            Self::Link(error) => error.is_recoverable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_from_connect_error() {
        let error: RelayError = ConnectError::Disconnected.into();
        assert!(matches!(error, RelayError::Connect(_)));
        assert!(error.is_recoverable());
        assert!(error.source().is_some());
    }

    #[test]
    fn test_from_link_error() {
        let error: RelayError = LinkError::SenderClosed.into();
        assert!(matches!(error, RelayError::Link(_)));
        assert!(!error.is_recoverable());
        assert!(error.source().is_some());
    }

    #[test]
    fn test_not_started_is_terminal() {
        assert!(!RelayError::NotStarted.is_recoverable());
        assert!(RelayError::NotStarted.to_string().contains("started"));
    }
}
