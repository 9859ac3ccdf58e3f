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

//! AMQP error conditions issued to upstream producers.

use std::fmt;

/// A symbolic AMQP error condition carried on a link close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCondition {
    /// The condition symbol.
    pub condition: &'static str,
    /// A human-readable description.
    pub description: &'static str,
}

impl fmt::Display for ErrorCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.condition, self.description)
    }
}

/// Issued when the relay has no usable downstream sender for a link:
/// either no sender is registered, the sender is not open, or the
/// downstream connection has just been lost. Producers may reattach and
/// will succeed once the downstream container is reachable again.
pub const NO_DOWNSTREAM_CONSUMER: ErrorCondition = ErrorCondition {
    condition: "relay:no-downstream-consumer",
    description: "no downstream consumer available for message",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let rendered = NO_DOWNSTREAM_CONSUMER.to_string();
        assert!(rendered.contains("relay:no-downstream-consumer"));
        assert!(rendered.contains("no downstream consumer"));
    }
}
