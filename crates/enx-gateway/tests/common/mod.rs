#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::bail;
use argon2::Params;
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use enx_core::{
    MessageReceipt, Messenger, MessengerStatus, PaymentGateway, PaymentSession,
    PaymentVerification, Role,
};
use enx_gateway::{AppState, GatewaySettings, MAX_UPLOAD_BYTES, Passwords, Stores, build_router};
use enx_platform::AuthSettings;
use enx_store::{InMemoryInvoiceStore, InMemoryItemStore, InMemoryShipmentStore, InMemoryUserStore};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

pub const PASSWORD: &str = "secret123";
pub const MULTIPART_BOUNDARY: &str = "enx-test-boundary";

#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<(String, String)>>,
    failing: Mutex<bool>,
}

impl RecordingMessenger {
    pub fn fail_sends(&self) {
        *self.failing.lock().unwrap() = true;
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Notifications leave on a detached task; poll until `count` arrived.
    pub async fn wait_for(&self, count: usize) -> Vec<(String, String)> {
        for _ in 0..100 {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.sent()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_message(&self, phone_number: &str, body: &str) -> anyhow::Result<MessageReceipt> {
        if *self.failing.lock().unwrap() {
            bail!("messenger offline");
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((phone_number.to_string(), body.to_string()));
        Ok(MessageReceipt {
            to: phone_number.to_string(),
            message_id: Some(format!("wamid.{}", sent.len())),
        })
    }

    async fn status(&self) -> MessengerStatus {
        MessengerStatus {
            ready: true,
            phone: Some("+2348000000000".into()),
            platform: Some("test".into()),
            connected: true,
        }
    }
}

/// Payment gateway whose verification outcome is scripted per test.
pub struct FakeGateway {
    status: Mutex<String>,
    amount: Mutex<Option<i64>>,
    initialized: Mutex<Vec<(String, i64, String)>>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            status: Mutex::new("success".into()),
            amount: Mutex::new(None),
            initialized: Mutex::new(Vec::new()),
        }
    }
}

impl FakeGateway {
    pub fn respond_with(&self, status: &str, amount: Option<i64>) {
        *self.status.lock().unwrap() = status.to_string();
        *self.amount.lock().unwrap() = amount;
    }

    pub fn initialized(&self) -> Vec<(String, i64, String)> {
        self.initialized.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn public_key(&self) -> &str {
        "pk_test_enx"
    }

    async fn initialize(
        &self,
        email: &str,
        amount_minor: i64,
        reference: &str,
    ) -> anyhow::Result<PaymentSession> {
        self.initialized.lock().unwrap().push((
            email.to_string(),
            amount_minor,
            reference.to_string(),
        ));
        Ok(PaymentSession {
            reference: reference.to_string(),
            authorization_url: format!("https://checkout.test/{reference}"),
            access_code: "access-1".into(),
        })
    }

    async fn verify(&self, reference: &str) -> anyhow::Result<PaymentVerification> {
        let status = self.status.lock().unwrap().clone();
        let amount = *self.amount.lock().unwrap();
        Ok(PaymentVerification {
            reference: reference.to_string(),
            status: status.clone(),
            amount,
            channel: Some("card".into()),
            raw: json!({ "status": status, "reference": reference, "amount": amount }),
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub messenger: Arc<RecordingMessenger>,
    pub gateway: Arc<FakeGateway>,
    pub uploads: TempDir,
}

pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_rate_limit(1_000)
    }

    pub fn with_rate_limit(max_attempts: u32) -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let messenger = Arc::new(RecordingMessenger::default());
        let gateway = Arc::new(FakeGateway::default());
        let settings = GatewaySettings {
            auth: AuthSettings {
                jwt_secret: "integration-secret".into(),
                token_ttl: chrono::Duration::days(7),
                reset_token_ttl: chrono::Duration::minutes(60),
                expose_reset_token: true,
                rate_limit_max: max_attempts,
                rate_limit_window: Duration::from_secs(900),
            },
            frontend_url: "http://localhost:3000".into(),
            uploads_dir: uploads.path().to_path_buf(),
            max_upload_bytes: MAX_UPLOAD_BYTES,
        };
        let stores = Stores {
            users: Arc::new(InMemoryUserStore::default()),
            shipments: Arc::new(InMemoryShipmentStore::default()),
            invoices: Arc::new(InMemoryInvoiceStore::default()),
            items: Arc::new(InMemoryItemStore::default()),
        };
        let state = AppState::new(stores, messenger.clone(), gateway.clone(), settings)
            .unwrap()
            .with_passwords(Passwords::with_params(Params::new(8, 1, 1, None).unwrap()));

        Self {
            router: build_router(state.clone()),
            state,
            messenger,
            gateway,
            uploads,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        Reply { status, body }
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Reply {
        self.call(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Reply {
        self.call(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> Reply {
        self.call(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Reply {
        self.call(Method::DELETE, uri, token, None).await
    }

    /// `files` entries are (field, file name, bytes).
    pub async fn multipart(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        files: &[(&str, &str, &[u8])],
    ) -> Reply {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        for (name, file_name, bytes) in files {
            body.extend_from_slice(
                format!(
                    "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Registers a customer and returns (token, user id).
    pub async fn register(&self, email: &str) -> (String, String) {
        let reply = self
            .post(
                "/api/auth/register",
                None,
                json!({
                    "firstName": "Amaka",
                    "lastName": "Eze",
                    "email": email,
                    "password": PASSWORD,
                    "phone": "+2348011111111",
                }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        (
            reply.body["token"].as_str().unwrap().to_string(),
            reply.body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    /// Registers an account and promotes it in the store.
    pub async fn admin(&self) -> (String, String) {
        let (token, id) = self.register("ops@enielexpress.com").await;
        let mut user = self
            .state
            .users
            .find_by_email("ops@enielexpress.com")
            .await
            .unwrap()
            .unwrap();
        user.role = Role::Admin;
        self.state.users.save(&user).await.unwrap();
        (token, id)
    }

    pub async fn create_shipment(&self, token: &str) -> Value {
        let reply = self.post("/api/tracking", Some(token), shipment_payload()).await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        reply.body["shipment"].clone()
    }

    pub async fn create_invoice(&self, token: &str, shipment_id: Option<&str>) -> Value {
        let mut payload = invoice_payload();
        if let Some(shipment_id) = shipment_id {
            payload["shipmentId"] = json!(shipment_id);
        }
        let reply = self.post("/api/invoices", Some(token), payload).await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        reply.body["invoice"].clone()
    }

    /// Opens a card payment for the invoice and returns the issued reference.
    pub async fn start_payment(&self, token: &str, invoice_id: &str) -> String {
        let reply = self
            .post(
                "/api/payments/initialize",
                Some(token),
                json!({ "invoiceId": invoice_id }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
        reply.body["reference"].as_str().unwrap().to_string()
    }
}

pub fn shipment_payload() -> Value {
    json!({
        "senderName": "Chidi Okafor",
        "senderPhone": "+2348012345678",
        "senderEmail": "chidi@example.com",
        "senderAddress": "12 Marina, Lagos",
        "recipientName": "Bola Adeyemi",
        "recipientPhone": "+2348098765432",
        "recipientEmail": "bola@example.com",
        "recipientAddress": "4 Garki, Abuja",
        "packageDescription": "Laptop",
        "packageWeight": 2.5,
        "packageValue": 1200,
        "serviceType": "express",
        "origin": "Lagos",
        "destination": "Abuja"
    })
}

pub fn invoice_payload() -> Value {
    json!({
        "customerName": "Amaka Eze",
        "customerEmail": "amaka@example.com",
        "customerPhone": "+2348011111111",
        "customerAddress": "7 Allen Avenue, Ikeja",
        "items": [
            { "description": "Express delivery", "quantity": 2, "price": 10 },
            { "description": "Insurance", "quantity": 1, "price": 5 }
        ],
        "dueDate": "2030-01-31"
    })
}
