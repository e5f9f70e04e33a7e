use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use enx_core::{MessageReceipt, Messenger, MessengerStatus};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::config::WhatsAppSettings;

const PLATFORM: &str = "whatsapp-cloud-api";

/// Sends text messages through the WhatsApp Cloud API. Built once at startup.
pub struct WhatsAppCloudMessenger {
    client: reqwest::Client,
    settings: WhatsAppSettings,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

impl WhatsAppCloudMessenger {
    pub fn new(settings: WhatsAppSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("failed to build WhatsApp HTTP client")?;

        Ok(Self { client, settings })
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.settings.phone_number_id, &self.settings.access_token) {
            (Some(id), Some(token)) => Some((id.as_str(), token.as_str())),
            _ => None,
        }
    }
}

/// Cloud API recipients are bare digits in international format.
pub fn to_wa_id(phone_number: &str) -> String {
    phone_number.chars().filter(char::is_ascii_digit).collect()
}

#[async_trait]
impl Messenger for WhatsAppCloudMessenger {
    async fn send_message(&self, phone_number: &str, body: &str) -> Result<MessageReceipt> {
        let (phone_number_id, access_token) = self
            .credentials()
            .context("WhatsApp messaging is not configured")?;
        let to = to_wa_id(phone_number);
        if to.is_empty() {
            anyhow::bail!("phone number {phone_number} has no digits");
        }

        let url = format!(
            "{}/{}/messages",
            self.settings.api_base.trim_end_matches('/'),
            phone_number_id
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(&json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": to,
                "type": "text",
                "text": { "preview_url": false, "body": body },
            }))
            .send()
            .await
            .context("WhatsApp request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("WhatsApp API returned {status}: {detail}");
        }

        let payload: SendResponse = response
            .json()
            .await
            .context("WhatsApp API returned an unreadable body")?;
        let message_id = payload.messages.into_iter().next().map(|m| m.id);
        info!(to = %to, message_id = ?message_id, "whatsapp message sent");

        Ok(MessageReceipt {
            to: phone_number.to_string(),
            message_id,
        })
    }

    async fn status(&self) -> MessengerStatus {
        let configured = self.credentials().is_some();
        MessengerStatus {
            ready: configured,
            phone: self.settings.phone_number.clone(),
            platform: Some(PLATFORM.to_string()),
            connected: configured,
        }
    }
}
