use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use enx_core::{PaymentGateway, PaymentSession, PaymentVerification};
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use crate::config::PaystackSettings;

/// Paystack REST client. Initialization and verification both run server-side
/// with the secret key; only the public key is ever handed to browsers.
pub struct PaystackGateway {
    client: reqwest::Client,
    settings: PaystackSettings,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    status: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Value,
}

impl PaystackGateway {
    pub fn new(settings: PaystackSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .context("failed to build Paystack HTTP client")?;

        Ok(Self { client, settings })
    }

    fn secret_key(&self) -> Result<&str> {
        self.settings
            .secret_key
            .as_deref()
            .context("Paystack secret key is not configured")
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.settings.base_url)
            .with_context(|| format!("invalid Paystack base url {}", self.settings.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Paystack base url cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn read_envelope(response: reqwest::Response) -> Result<Envelope> {
        let status = response.status();
        let envelope: Envelope = response
            .json()
            .await
            .with_context(|| format!("Paystack returned an unreadable body ({status})"))?;
        if !envelope.status {
            anyhow::bail!("Paystack rejected the request: {}", envelope.message);
        }
        Ok(envelope)
    }
}

fn required_str(data: &Value, key: &str) -> Result<String> {
    data.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .with_context(|| format!("Paystack response is missing {key}"))
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    fn public_key(&self) -> &str {
        &self.settings.public_key
    }

    async fn initialize(
        &self,
        email: &str,
        amount_minor: i64,
        reference: &str,
    ) -> Result<PaymentSession> {
        let mut body = json!({
            "email": email,
            "amount": amount_minor,
            "reference": reference,
        });
        if let Some(callback_url) = &self.settings.callback_url {
            body["callback_url"] = json!(callback_url);
        }

        let response = self
            .client
            .post(self.endpoint(&["transaction", "initialize"])?)
            .bearer_auth(self.secret_key()?)
            .json(&body)
            .send()
            .await
            .context("Paystack initialize request failed")?;
        let envelope = Self::read_envelope(response).await?;

        Ok(PaymentSession {
            reference: envelope
                .data
                .get("reference")
                .and_then(Value::as_str)
                .unwrap_or(reference)
                .to_string(),
            authorization_url: required_str(&envelope.data, "authorization_url")?,
            access_code: required_str(&envelope.data, "access_code")?,
        })
    }

    async fn verify(&self, reference: &str) -> Result<PaymentVerification> {
        let response = self
            .client
            .get(self.endpoint(&["transaction", "verify", reference])?)
            .bearer_auth(self.secret_key()?)
            .send()
            .await
            .context("Paystack verify request failed")?;
        let envelope = Self::read_envelope(response).await?;
        let data = envelope.data;

        Ok(PaymentVerification {
            reference: data
                .get("reference")
                .and_then(Value::as_str)
                .unwrap_or(reference)
                .to_string(),
            status: required_str(&data, "status")?,
            amount: data.get("amount").and_then(Value::as_i64),
            channel: data
                .get("channel")
                .and_then(Value::as_str)
                .map(str::to_string),
            raw: data,
        })
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::*;

    fn gateway(base_url: String) -> PaystackGateway {
        PaystackGateway::new(PaystackSettings {
            secret_key: Some("sk_test_1".into()),
            public_key: "pk_test_1".into(),
            base_url,
            callback_url: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn initialize_returns_checkout_session() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/transaction/initialize")
                    .header("authorization", "Bearer sk_test_1");
                then.status(200).json_body(json!({
                    "status": true,
                    "message": "Authorization URL created",
                    "data": {
                        "authorization_url": "https://checkout.paystack.com/abc",
                        "access_code": "abc",
                        "reference": "ENX1700000000000"
                    }
                }));
            })
            .await;

        let session = gateway(server.base_url())
            .initialize("amaka@example.com", 2750, "ENX1700000000000")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(session.access_code, "abc");
        assert_eq!(session.authorization_url, "https://checkout.paystack.com/abc");
    }

    #[tokio::test]
    async fn verify_reports_gateway_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/transaction/verify/ENX1700000000000");
                then.status(200).json_body(json!({
                    "status": true,
                    "message": "Verification successful",
                    "data": {
                        "status": "abandoned",
                        "reference": "ENX1700000000000",
                        "amount": 2750,
                        "channel": "card"
                    }
                }));
            })
            .await;

        let verification = gateway(server.base_url())
            .verify("ENX1700000000000")
            .await
            .unwrap();

        assert!(!verification.is_success());
        assert_eq!(verification.amount, Some(2750));
        assert_eq!(verification.raw["status"], "abandoned");
    }

    #[tokio::test]
    async fn rejected_envelopes_become_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/transaction/verify/unknown");
                then.status(400)
                    .json_body(json!({"status": false, "message": "Transaction reference not found"}));
            })
            .await;

        let err = gateway(server.base_url()).verify("unknown").await.unwrap_err();
        assert!(err.to_string().contains("Transaction reference not found"));
    }

    #[tokio::test]
    async fn missing_secret_key_fails_before_any_request() {
        let gateway = PaystackGateway::new(PaystackSettings {
            secret_key: None,
            public_key: String::new(),
            base_url: "https://api.paystack.co".into(),
            callback_url: None,
        })
        .unwrap();
        assert!(gateway.verify("ENX1").await.is_err());
    }
}
