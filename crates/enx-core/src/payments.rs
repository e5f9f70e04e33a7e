use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSession {
    pub reference: String,
    pub authorization_url: String,
    pub access_code: String,
}

/// Outcome reported by the gateway for a transaction reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentVerification {
    pub reference: String,
    pub status: String,
    /// Amount in minor units (kobo/cents) as charged.
    pub amount: Option<i64>,
    pub channel: Option<String>,
    pub raw: serde_json::Value,
}

impl PaymentVerification {
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn public_key(&self) -> &str;

    async fn initialize(
        &self,
        email: &str,
        amount_minor: i64,
        reference: &str,
    ) -> anyhow::Result<PaymentSession>;

    async fn verify(&self, reference: &str) -> anyhow::Result<PaymentVerification>;
}
