mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn scanned_codes_resolve_to_shipments() {
    let app = TestApp::new();
    let (token, _) = app.register("amaka@example.com").await;
    let shipment = app.create_shipment(&token).await;
    let number = shipment["trackingNumber"].as_str().unwrap();

    let codes = [
        (json!({ "trackingNumber": number }).to_string(), "qr"),
        (format!("https://track.example.com/t?number={number}"), "qr"),
        (number.to_string(), "barcode"),
    ];
    for (code, kind) in codes {
        let reply = app
            .post("/api/scan/process", None, json!({ "code": code, "type": kind }))
            .await;
        assert_eq!(reply.status, StatusCode::OK, "{code}: {}", reply.body);
        assert_eq!(reply.body["message"], "Code processed successfully");
        assert_eq!(reply.body["trackingNumber"], number);
        assert_eq!(reply.body["shipment"]["id"], shipment["id"]);
    }

    let unknown = app
        .post("/api/scan/process", None, json!({ "code": "ENX999999999" }))
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let empty = app.post("/api/scan/process", None, json!({ "code": "  " })).await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn location_scans_keep_status_unless_given() {
    let app = TestApp::new();
    let (token, _) = app.register("amaka@example.com").await;
    let shipment = app.create_shipment(&token).await;
    let number = shipment["trackingNumber"].as_str().unwrap();

    let reply = app
        .post(
            "/api/scan/update-location",
            Some(&token),
            json!({ "trackingNumber": number, "location": "Ibadan Hub" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.body["message"], "Shipment location updated successfully");
    let history = reply.body["shipment"]["trackingHistory"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1]["status"], "Package Received");
    assert_eq!(history[1]["description"], "Scanned at Ibadan Hub");

    let delivered = app
        .post(
            "/api/scan/update-location",
            Some(&token),
            json!({ "trackingNumber": number, "location": "Abuja", "status": "Delivered" }),
        )
        .await;
    assert_eq!(delivered.body["shipment"]["status"], "Delivered");
    assert!(delivered.body["shipment"]["actualDelivery"].is_string());

    let anonymous = app
        .post(
            "/api/scan/update-location",
            None,
            json!({ "trackingNumber": number, "location": "Abuja" }),
        )
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn qr_and_barcode_links() {
    let app = TestApp::new();
    let (token, _) = app.register("amaka@example.com").await;
    let shipment = app.create_shipment(&token).await;
    let number = shipment["trackingNumber"].as_str().unwrap();

    let qr = app.get(&format!("/api/scan/qr/{number}"), None).await;
    assert_eq!(qr.status, StatusCode::OK);
    assert_eq!(qr.body["qrData"]["trackingNumber"], number);
    assert_eq!(qr.body["qrData"]["origin"], "Lagos");
    let qr_url = qr.body["qrUrl"].as_str().unwrap();
    assert!(qr_url.starts_with("https://api.qrserver.com/v1/create-qr-code/?size=200x200&data="));

    let barcode = app.get(&format!("/api/scan/barcode/{number}"), None).await;
    assert_eq!(barcode.status, StatusCode::OK);
    assert_eq!(barcode.body["barcodeData"], number);
    assert_eq!(
        barcode.body["barcodeUrl"],
        format!("https://api.barcode.com/v1/barcode?data={number}&type=code128")
    );
}

#[tokio::test]
async fn explicit_whatsapp_sends() {
    let app = TestApp::new();
    let (token, _) = app.register("amaka@example.com").await;

    let plain = app
        .post(
            "/api/whatsapp/send",
            Some(&token),
            json!({ "phoneNumber": "+2348055555555", "message": "Your parcel is ready" }),
        )
        .await;
    assert_eq!(plain.status, StatusCode::OK);
    assert_eq!(plain.body["message"], "Message sent successfully");
    assert_eq!(plain.body["result"]["to"], "+2348055555555");

    let payment = app
        .post(
            "/api/whatsapp/payment-confirmation",
            Some(&token),
            json!({
                "phoneNumber": "+2348055555555",
                "invoiceNumber": "INV20300101001",
                "amount": 1234.5,
                "currency": "NGN",
                "paymentDate": "2030-01-02",
            }),
        )
        .await;
    assert_eq!(payment.status, StatusCode::OK);

    let delivery = app
        .post(
            "/api/whatsapp/delivery-notification",
            Some(&token),
            json!({
                "phoneNumber": "+2348055555555",
                "trackingNumber": "ENX123456789",
                "recipientName": "Bola",
            }),
        )
        .await;
    assert_eq!(delivery.status, StatusCode::OK);
    assert_eq!(delivery.body["message"], "Delivery notification sent successfully");

    let sent = app.messenger.sent();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0].1, "Your parcel is ready");
    assert!(sent[1].1.contains("₦1,234.50"));
    assert!(sent[1].1.contains("2030-01-02"));
    assert!(sent[2].1.contains("Dear Bola"));

    let invalid = app
        .post(
            "/api/whatsapp/send",
            Some(&token),
            json!({ "phoneNumber": "call me", "message": "hi" }),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn explicit_send_failures_surface_as_server_errors() {
    let app = TestApp::new();
    let (token, _) = app.register("amaka@example.com").await;
    app.messenger.fail_sends();

    let reply = app
        .post(
            "/api/whatsapp/tracking-update",
            Some(&token),
            json!({
                "phoneNumber": "+2348055555555",
                "trackingNumber": "ENX123456789",
                "status": "In Transit",
                "location": "Ibadan",
            }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.body["message"], "Server error");
}

#[tokio::test]
async fn whatsapp_subscribe_and_status() {
    let app = TestApp::new();
    let (token, _) = app.register("amaka@example.com").await;
    let (admin, _) = app.admin().await;
    let shipment = app.create_shipment(&token).await;
    let number = shipment["trackingNumber"].as_str().unwrap();

    let subscribed = app
        .post(
            "/api/whatsapp/subscribe",
            None,
            json!({ "phoneNumber": "+2348066666666", "trackingNumber": number }),
        )
        .await;
    assert_eq!(subscribed.status, StatusCode::OK);
    assert_eq!(subscribed.body["trackingNumber"], number);

    let denied = app.get("/api/whatsapp/status", Some(&token)).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let status = app.get("/api/whatsapp/status", Some(&admin)).await;
    assert_eq!(status.status, StatusCode::OK);
    assert_eq!(status.body["status"]["ready"], true);
    assert_eq!(status.body["status"]["platform"], "test");
}

#[tokio::test]
async fn health_index_and_dashboard() {
    let app = TestApp::new();
    let (token, _) = app.register("amaka@example.com").await;
    let (admin, _) = app.admin().await;
    app.create_shipment(&token).await;
    app.create_invoice(&token, None).await;

    let health = app.get("/api/health", None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["status"], "OK");

    let index = app.get("/api", None).await;
    assert_eq!(index.body["endpoints"]["tracking"], "/api/tracking");

    let stats = app.get("/api/admin/stats", Some(&admin)).await;
    assert_eq!(stats.status, StatusCode::OK);
    assert_eq!(stats.body["totalShipments"], 1);
    assert_eq!(stats.body["totalInvoices"], 1);
    assert_eq!(stats.body["shipments"][0]["status"], "Package Received");

    let denied = app.get("/api/admin/stats", Some(&token)).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
}
