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

//! Upstream address parsing and downstream address rewriting.
//!
//! Upstream producers attach to addresses of the form
//! `endpoint/tenant[/device]`. The downstream container is addressed by
//! endpoint and tenant only; the device component is discarded and the
//! canonical `/` separator is replaced with the configured downstream
//! path separator.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The canonical path separator used in upstream target addresses.
pub const DEFAULT_PATH_SEPARATOR: char = '/';

/// Errors raised while parsing an upstream target address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The address has fewer than the two required path segments.
    #[error("address must contain at least endpoint and tenant segments: '{address}'")]
    MissingSegments {
        /// The offending address.
        address: String,
    },

    /// The endpoint or tenant segment is empty.
    #[error("address contains an empty segment: '{address}'")]
    EmptySegment {
        /// The offending address.
        address: String,
    },
}

/// A parsed upstream target address.
///
/// The first two segments are the endpoint (for example `telemetry` or
/// `event`) and the tenant. Anything after the tenant is treated as the
/// device component and plays no part in downstream addressing.
///
/// # Examples
///
/// ```rust
/// use amqp_relay::address::ResourceAddress;
///
/// let address: ResourceAddress = "telemetry/TENANT1/4711".parse()?;
/// assert_eq!(address.endpoint(), "telemetry");
/// assert_eq!(address.tenant(), "TENANT1");
/// assert_eq!(address.device(), Some("4711"));
/// assert_eq!(address.downstream_address('.'), "telemetry.TENANT1");
/// # Ok::<(), amqp_relay::address::AddressError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceAddress {
    endpoint: String,
    tenant: String,
    device: Option<String>,
}

impl ResourceAddress {
    /// Parses an address of the form `endpoint/tenant[/device]`.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::MissingSegments`] if the address has fewer
    /// than two path segments and [`AddressError::EmptySegment`] if the
    /// endpoint or tenant segment is empty.
    pub fn parse(address: &str) -> Result<Self, AddressError> {
        let segments: Vec<&str> = address.split(DEFAULT_PATH_SEPARATOR).collect();
        if segments.len() < 2 {
            return Err(AddressError::MissingSegments {
                address: address.to_string(),
            });
        }
        if segments[0].is_empty() || segments[1].is_empty() {
            return Err(AddressError::EmptySegment {
                address: address.to_string(),
            });
        }
        let device = if segments.len() > 2 {
            let rest = segments[2..].join("/");
            if rest.is_empty() { None } else { Some(rest) }
        } else {
            None
        };
        Ok(Self {
            endpoint: segments[0].to_string(),
            tenant: segments[1].to_string(),
            device,
        })
    }

    /// The endpoint segment, e.g. `telemetry`.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The tenant segment.
    #[must_use]
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// The device component, if the address carried one.
    #[must_use]
    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    /// Renders the address used for the downstream attach.
    ///
    /// The device component is discarded and the canonical separator is
    /// replaced with `separator`.
    #[must_use]
    pub fn downstream_address(&self, separator: char) -> String {
        format!("{}{}{}", self.endpoint, separator, self.tenant)
    }
}

impl FromStr for ResourceAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.endpoint, self.tenant)?;
        if let Some(device) = &self.device {
            write!(f, "/{}", device)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_endpoint_and_tenant() {
        let address = ResourceAddress::parse("telemetry/TENANT1").unwrap();
        assert_eq!(address.endpoint(), "telemetry");
        assert_eq!(address.tenant(), "TENANT1");
        assert_eq!(address.device(), None);
    }

    #[test]
    fn test_parse_with_device() {
        let address = ResourceAddress::parse("event/TENANT1/4711").unwrap();
        assert_eq!(address.device(), Some("4711"));
    }

    #[test]
    fn test_parse_deep_path_folds_into_device() {
        let address = ResourceAddress::parse("telemetry/t1/gw/4711").unwrap();
        assert_eq!(address.device(), Some("gw/4711"));
    }

    #[test]
    fn test_parse_rejects_single_segment() {
        let result = ResourceAddress::parse("telemetry");
        assert!(matches!(result, Err(AddressError::MissingSegments { .. })));
    }

    #[test]
    fn test_parse_rejects_empty_segments() {
        assert!(matches!(
            ResourceAddress::parse("/TENANT1"),
            Err(AddressError::EmptySegment { .. })
        ));
        assert!(matches!(
            ResourceAddress::parse("telemetry/"),
            Err(AddressError::EmptySegment { .. })
        ));
    }

    #[test]
    fn test_downstream_address_discards_device() {
        let address = ResourceAddress::parse("telemetry/TENANT1/4711").unwrap();
        assert_eq!(address.downstream_address('/'), "telemetry/TENANT1");
    }

    #[test]
    fn test_downstream_address_with_custom_separator() {
        let address = ResourceAddress::parse("event/TENANT1").unwrap();
        assert_eq!(address.downstream_address('.'), "event.TENANT1");
    }

    #[test]
    fn test_display_round_trip() {
        for input in ["telemetry/t1", "event/t1/dev", "telemetry/t1/gw/dev"] {
            let address = ResourceAddress::parse(input).unwrap();
            assert_eq!(address.to_string(), input);
        }
    }
}
