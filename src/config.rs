//! Carrier settings supplied at construction time.
//!
//! How these values are discovered (env, files, CI secrets) is the calling
//! test suite's business; this crate only consumes them.

use crate::message::Address;
use serde::{Deserialize, Serialize};

fn default_api_url() -> String {
    "https://api.twilio.com/2010-04-01".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierConfig {
    /// Base URL of the carrier REST API.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Account identifier, also the basic-auth username.
    pub account_id: String,
    /// API token, the basic-auth password.
    pub api_token: String,
    /// Number outbound messages are sent from.
    pub source_number: String,
}

impl CarrierConfig {
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn source_address(&self) -> Address {
        Address::new(&self.source_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_toml() {
        let config = CarrierConfig::from_toml_str(
            r#"
            account_id = "AC123"
            api_token = "secret"
            source_number = "+15550001111"
            "#,
        )
        .unwrap();

        assert_eq!(config.api_url, "https://api.twilio.com/2010-04-01");
        assert_eq!(config.source_address().as_str(), "+15550001111");
    }

    #[test]
    fn api_url_can_be_overridden() {
        let config = CarrierConfig::from_toml_str(
            r#"
            api_url = "http://localhost:8080"
            account_id = "AC123"
            api_token = "secret"
            source_number = "15550001111"
            "#,
        )
        .unwrap();

        assert_eq!(config.api_url, "http://localhost:8080");
    }

    #[test]
    fn missing_credentials_fail() {
        assert!(CarrierConfig::from_toml_str("source_number = \"+1555\"").is_err());
    }
}
