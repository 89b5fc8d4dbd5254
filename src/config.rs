/* src/config.rs */

use serde::Deserialize;
use serde_json::Value;

use crate::error::{AddrError, Result};
use crate::extractor::{ProxyResolver, X_FORWARDED_FOR};
use crate::trust::TrustSpec;

fn default_header() -> String {
    X_FORWARDED_FOR.to_string()
}

/// Resolver settings as they appear in an application config file.
///
/// ```rust
/// use real_proxy::ProxyConfig;
///
/// let config: ProxyConfig =
///     serde_json::from_str(r#"{ "trust": ["loopback", "10.0.0.0/8"] }"#).unwrap();
/// assert_eq!(config.header, "x-forwarded-for");
/// let resolver = config.build().unwrap();
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Address, subnet, alias, or a list of them. Defaults to trusting nobody.
    pub trust: TrustSpec,
    /// Header carrying the forwarded chain.
    pub header: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            trust: TrustSpec::default(),
            header: default_header(),
        }
    }
}

impl ProxyConfig {
    /// Read settings from a JSON value, keeping typed trust errors intact.
    ///
    /// Going through `serde_json::from_value` instead folds them into a
    /// `serde_json::Error` message.
    pub fn from_value(value: Value) -> Result<Self> {
        let mut fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(AddrError::InvalidFormat(format!(
                    "proxy config must be an object, got {other}"
                )));
            }
        };
        let trust = match fields.remove("trust") {
            Some(trust) => TrustSpec::try_from(trust)?,
            None => TrustSpec::default(),
        };
        let header = match fields.remove("header") {
            Some(Value::String(header)) => header,
            Some(other) => {
                return Err(AddrError::InvalidFormat(format!(
                    "proxy header must be a string, got {other}"
                )));
            }
            None => default_header(),
        };
        Ok(Self { trust, header })
    }

    /// Compile the trust spec once into a reusable resolver.
    pub fn build(self) -> Result<ProxyResolver> {
        ProxyResolver::new()
            .with_header(self.header)
            .with_trust(self.trust)
    }
}
