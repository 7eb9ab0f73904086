//! REST client for a Twilio-shaped messaging carrier.
//!
//! Outbound sends are a form-encoded POST to the account's message
//! collection; fetch-by-id is a GET on the message resource. Both calls
//! authenticate with HTTP basic auth (account id + API token).

use super::Transport;
use crate::config::CarrierConfig;
use crate::message::{Address, Direction, Message};
use async_trait::async_trait;
use serde::Deserialize;

pub struct HttpCarrier {
    config: CarrierConfig,
    client: reqwest::Client,
}

impl HttpCarrier {
    pub fn new(config: CarrierConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.config.api_url, self.config.account_id
        )
    }

    fn message_url(&self, id: &str) -> String {
        format!(
            "{}/Accounts/{}/Messages/{}.json",
            self.config.api_url, self.config.account_id, id
        )
    }
}

/// Wire shape of one message resource as the carrier returns it.
#[derive(Debug, Deserialize)]
struct MessageRecord {
    sid: String,
    from: String,
    to: String,
    body: String,
    direction: String,
}

impl MessageRecord {
    fn into_message(self) -> Message {
        // The carrier reports "outbound-api", "outbound-reply" etc.; anything
        // else is a message the remote party sent to us.
        let direction = if self.direction.starts_with("outbound") {
            Direction::Outbound
        } else {
            Direction::Inbound
        };
        Message {
            id: self.sid,
            from: Address::new(&self.from),
            to: Address::new(&self.to),
            body: self.body,
            direction,
        }
    }
}

#[async_trait]
impl Transport for HttpCarrier {
    async fn send(&self, to: &Address, from: &Address, body: &str) -> anyhow::Result<Message> {
        let form = [
            ("To", to.as_str()),
            ("From", from.as_str()),
            ("Body", body),
        ];

        let resp = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_id, Some(&self.config.api_token))
            .form(&form)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_body = resp.text().await.unwrap_or_default();
            tracing::error!("carrier send failed: {status}: {error_body}");
            anyhow::bail!("carrier API error: {status}");
        }

        let record: MessageRecord = resp.json().await?;
        Ok(record.into_message())
    }

    async fn fetch_by_id(&self, id: &str) -> anyhow::Result<Message> {
        let resp = self
            .client
            .get(self.message_url(id))
            .basic_auth(&self.config.account_id, Some(&self.config.api_token))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            tracing::error!("carrier fetch for message {id} failed: {status}");
            anyhow::bail!("carrier API error: {status}");
        }

        let record: MessageRecord = resp.json().await?;
        Ok(record.into_message())
    }
}
