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

//! Registry key and sender handle types.

use crate::link::traits::{DownstreamSender, UpstreamReceiver};
use std::fmt;
use std::sync::Arc;

/// Identifies an upstream receiver within the registry.
///
/// A receiver is unique per `(connection, link)` pair: the connection id
/// is stable for the underlying upstream connection and the link id is
/// unique within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkKey {
    connection_id: String,
    link_id: String,
}

impl LinkKey {
    /// Creates a key from its parts.
    #[must_use]
    pub fn new(connection_id: impl Into<String>, link_id: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            link_id: link_id.into(),
        }
    }

    /// Derives the key for a receiver.
    #[must_use]
    pub fn for_receiver(receiver: &dyn UpstreamReceiver) -> Self {
        Self::new(receiver.connection_id(), receiver.link_id())
    }

    /// The upstream connection id.
    #[must_use]
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// The link id within the connection.
    #[must_use]
    pub fn link_id(&self) -> &str {
        &self.link_id
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "con: {}, link: {}", self.connection_id, self.link_id)
    }
}

/// A downstream sender together with the upstream connection that owns it.
///
/// The owning connection id travels with the sender so bulk teardown and
/// logging can name the upstream peer without consulting the registry.
#[derive(Clone)]
pub struct SenderHandle {
    sender: Arc<dyn DownstreamSender>,
    owner: String,
}

impl SenderHandle {
    /// Wraps a sender, recording the owning upstream connection id.
    #[must_use]
    pub fn new(sender: Arc<dyn DownstreamSender>, owner: impl Into<String>) -> Self {
        Self {
            sender,
            owner: owner.into(),
        }
    }

    /// The downstream sender link.
    #[must_use]
    pub fn sender(&self) -> &Arc<dyn DownstreamSender> {
        &self.sender
    }

    /// The upstream connection id that owns this sender.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Whether the sender link is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.sender.is_open()
    }
}

impl fmt::Debug for SenderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderHandle")
            .field("owner", &self.owner)
            .field("open", &self.sender.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_equality() {
        let a = LinkKey::new("con-1", "link-1");
        let b = LinkKey::new("con-1", "link-1");
        let c = LinkKey::new("con-1", "link-2");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_key_display() {
        let key = LinkKey::new("con-1", "link-1");
        assert_eq!(key.to_string(), "con: con-1, link: link-1");
    }
}
