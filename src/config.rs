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

//! Configuration types for the relay.

use crate::address::DEFAULT_PATH_SEPARATOR;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a [`ForwardingRelay`](crate::ForwardingRelay).
///
/// All fields have sensible defaults and the struct deserializes from any
/// serde format, so partial configuration files work out of the box.
///
/// # Examples
///
/// ```rust
/// use amqp_relay::RelayConfig;
///
/// // Use default configuration
/// let config = RelayConfig::default();
///
/// // Customize configuration
/// let config = RelayConfig {
///     wait_for_downstream_connection: true,
///     reconnect_attempts: 0,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// When true, `start` completes only after the first successful
    /// connect to the downstream container. When false, `start` completes
    /// immediately and the connection is established in the background.
    ///
    /// Default: `false`
    pub wait_for_downstream_connection: bool,

    /// Character used in place of `/` when rewriting upstream target
    /// addresses for the downstream attach.
    ///
    /// Default: `/`
    pub path_separator: char,

    /// Timeout for a single downstream connect attempt, in milliseconds.
    ///
    /// Default: 100
    pub connect_timeout_millis: u64,

    /// Maximum number of reconnect attempts the connection factory should
    /// make. `-1` means unlimited, `0` disables reconnecting entirely,
    /// including the relay's own reconnect after a downstream disconnect.
    ///
    /// Default: -1
    pub reconnect_attempts: i32,

    /// Delay between the connection factory's reconnect attempts, in
    /// milliseconds.
    ///
    /// Default: 200
    pub reconnect_interval_millis: u64,

    /// Deadline for an upstream drain request forwarded on behalf of the
    /// downstream container, in milliseconds. When the deadline passes the
    /// drain is abandoned and the next FLOW re-syncs credit.
    ///
    /// Default: 10000
    pub drain_timeout_millis: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            wait_for_downstream_connection: false,
            path_separator: DEFAULT_PATH_SEPARATOR,
            connect_timeout_millis: 100,
            reconnect_attempts: -1,
            reconnect_interval_millis: 200,
            drain_timeout_millis: 10_000,
        }
    }
}

impl RelayConfig {
    /// The connect timeout as a [`Duration`].
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_millis)
    }

    /// The reconnect interval as a [`Duration`].
    #[must_use]
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_millis)
    }

    /// The upstream drain deadline as a [`Duration`].
    #[must_use]
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_millis)
    }

    /// Builds the options handed to the connection factory.
    #[must_use]
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            connect_timeout: self.connect_timeout(),
            reconnect_attempts: self.reconnect_attempts,
            reconnect_interval: self.reconnect_interval(),
        }
    }
}

/// Options applied by a [`ConnectionFactory`](crate::ConnectionFactory)
/// when establishing the downstream connection.
///
/// The factory owns the initial-connect retry loop; the relay only
/// schedules its own reconnect after an established connection is lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Timeout for a single connect attempt.
    pub connect_timeout: Duration,
    /// Maximum reconnect attempts; `-1` means unlimited.
    pub reconnect_attempts: i32,
    /// Delay between reconnect attempts.
    pub reconnect_interval: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        RelayConfig::default().connect_options()
    }
}
