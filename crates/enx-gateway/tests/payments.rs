mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nproof";

#[tokio::test]
async fn initialize_opens_a_gateway_session() {
    let app = TestApp::new();
    let (token, _) = app.register("amaka@example.com").await;
    let invoice = app.create_invoice(&token, None).await;
    let id = invoice["id"].as_str().unwrap();

    let reply = app
        .post("/api/payments/initialize", Some(&token), json!({ "invoiceId": id }))
        .await;

    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.body["message"], "Payment initialized");
    assert_eq!(reply.body["publicKey"], "pk_test_enx");
    assert_eq!(reply.body["accessCode"], "access-1");
    let reference = reply.body["reference"].as_str().unwrap();
    assert!(reference.starts_with("ENX"));

    let calls = app.gateway.initialized();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "amaka@example.com");
    assert_eq!(calls[0].1, 2750);
    assert_eq!(calls[0].2, reference);
}

#[tokio::test]
async fn initialize_requires_an_invoice_id() {
    let app = TestApp::new();
    let (token, _) = app.register("amaka@example.com").await;

    let reply = app
        .post("/api/payments/initialize", Some(&token), json!({}))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["errors"][0]["message"], "Invoice ID is required");
}

#[tokio::test]
async fn verified_payment_marks_invoice_and_shipment_paid() {
    let app = TestApp::new();
    let (token, _) = app.register("amaka@example.com").await;
    let shipment = app.create_shipment(&token).await;
    let number = shipment["trackingNumber"].as_str().unwrap().to_string();
    let invoice = app
        .create_invoice(&token, Some(shipment["id"].as_str().unwrap()))
        .await;
    let id = invoice["id"].as_str().unwrap();
    app.messenger.wait_for(1).await;
    app.gateway.respond_with("success", Some(2750));
    let reference = app.start_payment(&token, id).await;

    let reply = app
        .post(
            "/api/payments/verify",
            None,
            json!({ "reference": reference, "invoiceId": id }),
        )
        .await;

    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.body["message"], "Payment verified successfully");
    assert_eq!(reply.body["invoice"]["status"], "paid");
    assert_eq!(reply.body["invoice"]["paymentMethod"], "card");
    assert_eq!(reply.body["invoice"]["paymentReference"], reference.as_str());
    assert!(reply.body["invoice"]["paymentDate"].is_string());

    let shipment = app.get(&format!("/api/tracking/{number}"), None).await;
    assert_eq!(shipment.body["paymentStatus"], "paid");

    let sent = app.messenger.wait_for(2).await;
    let confirmation = sent
        .iter()
        .find(|(_, body)| body.contains("Payment Confirmation"))
        .unwrap();
    assert_eq!(confirmation.0, "+2348011111111");
    assert!(confirmation.1.contains("$27.50"));

    let again = app
        .post(
            "/api/payments/initialize",
            Some(&token),
            json!({ "invoiceId": id }),
        )
        .await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(again.body["message"], "Invoice is already paid");
}

#[tokio::test]
async fn failed_verification_leaves_invoice_untouched() {
    let app = TestApp::new();
    let (token, _) = app.register("amaka@example.com").await;
    let invoice = app.create_invoice(&token, None).await;
    let id = invoice["id"].as_str().unwrap();
    app.gateway.respond_with("abandoned", None);
    let reference = app.start_payment(&token, id).await;

    let reply = app
        .post(
            "/api/payments/verify",
            None,
            json!({ "reference": reference, "invoiceId": id }),
        )
        .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], "Payment verification failed");
    assert_eq!(reply.body["details"]["status"], "abandoned");

    let stored = app.get(&format!("/api/invoices/{id}"), None).await;
    assert_eq!(stored.body["status"], "pending");
}

#[tokio::test]
async fn short_payments_are_refused() {
    let app = TestApp::new();
    let (token, _) = app.register("amaka@example.com").await;
    let invoice = app.create_invoice(&token, None).await;
    let id = invoice["id"].as_str().unwrap();
    app.gateway.respond_with("success", Some(100));
    let reference = app.start_payment(&token, id).await;

    let reply = app
        .post(
            "/api/payments/verify",
            None,
            json!({ "reference": reference, "invoiceId": id }),
        )
        .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], "Payment amount does not cover the invoice");
    let stored = app.get(&format!("/api/invoices/{id}"), None).await;
    assert_eq!(stored.body["status"], "pending");
}

#[tokio::test]
async fn a_reference_settles_only_the_invoice_it_was_issued_for() {
    let app = TestApp::new();
    let (token, _) = app.register("amaka@example.com").await;
    let first = app.create_invoice(&token, None).await;
    let second = app.create_invoice(&token, None).await;
    let first_id = first["id"].as_str().unwrap();
    let second_id = second["id"].as_str().unwrap();
    app.gateway.respond_with("success", Some(2750));
    let reference = app.start_payment(&token, first_id).await;

    let paid = app
        .post(
            "/api/payments/verify",
            None,
            json!({ "reference": reference, "invoiceId": first_id }),
        )
        .await;
    assert_eq!(paid.status, StatusCode::OK, "{}", paid.body);

    let reused = app
        .post(
            "/api/payments/verify",
            None,
            json!({ "reference": reference, "invoiceId": second_id }),
        )
        .await;
    assert_eq!(reused.status, StatusCode::BAD_REQUEST);
    assert_eq!(reused.body["message"], "Payment reference does not match this invoice");
    let stored = app.get(&format!("/api/invoices/{second_id}"), None).await;
    assert_eq!(stored.body["status"], "pending");

    let replay = app
        .post(
            "/api/payments/verify",
            None,
            json!({ "reference": reference, "invoiceId": first_id }),
        )
        .await;
    assert_eq!(replay.status, StatusCode::OK);
    assert_eq!(replay.body["invoice"]["status"], "paid");
}

#[tokio::test]
async fn bank_transfer_without_a_file_is_rejected() {
    let app = TestApp::new();
    let (token, _) = app.register("amaka@example.com").await;
    let invoice = app.create_invoice(&token, None).await;
    let id = invoice["id"].as_str().unwrap();

    let reply = app
        .multipart("/api/payments/bank-transfer", &[("invoiceId", id)], &[])
        .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], "Please upload proof of transfer");
}

#[tokio::test]
async fn bank_transfer_accepts_images_only() {
    let app = TestApp::new();
    let (token, _) = app.register("amaka@example.com").await;
    let invoice = app.create_invoice(&token, None).await;
    let id = invoice["id"].as_str().unwrap();

    let reply = app
        .multipart(
            "/api/payments/bank-transfer",
            &[("invoiceId", id)],
            &[("transferProof", "receipt.pdf", b"%PDF-1.4".as_slice())],
        )
        .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], "Only image files are allowed!");
}

#[tokio::test]
async fn bank_transfer_review_flow() {
    let app = TestApp::new();
    let (token, _) = app.register("amaka@example.com").await;
    let (admin, _) = app.admin().await;
    let invoice = app.create_invoice(&token, None).await;
    let id = invoice["id"].as_str().unwrap();

    let submitted = app
        .multipart(
            "/api/payments/bank-transfer",
            &[("invoiceId", id)],
            &[("transferProof", "receipt.PNG", PNG)],
        )
        .await;
    assert_eq!(submitted.status, StatusCode::OK, "{}", submitted.body);
    assert_eq!(
        submitted.body["message"],
        "Proof of transfer submitted successfully. Your payment will be verified shortly."
    );
    assert_eq!(submitted.body["invoice"]["status"], "pending_verification");
    assert_eq!(submitted.body["invoice"]["paymentMethod"], "bank");
    let proof = submitted.body["invoice"]["transferProof"].as_str().unwrap();
    assert!(proof.ends_with(".png"));
    assert_eq!(std::fs::read(proof).unwrap(), PNG);
    assert!(proof.starts_with(app.uploads.path().to_str().unwrap()));

    let customer_review = app
        .put(
            &format!("/api/payments/verify-bank-transfer/{id}"),
            Some(&token),
            json!({ "verified": true }),
        )
        .await;
    assert_eq!(customer_review.status, StatusCode::FORBIDDEN);

    let rejected = app
        .put(
            &format!("/api/payments/verify-bank-transfer/{id}"),
            Some(&admin),
            json!({ "verified": false, "notes": "Amount mismatch" }),
        )
        .await;
    assert_eq!(rejected.status, StatusCode::OK);
    assert_eq!(rejected.body["message"], "Bank transfer rejected successfully");
    assert_eq!(rejected.body["invoice"]["status"], "payment_rejected");
    assert_eq!(rejected.body["invoice"]["adminNotes"], "Amount mismatch");

    let verified = app
        .put(
            &format!("/api/payments/verify-bank-transfer/{id}"),
            Some(&admin),
            json!({ "verified": true }),
        )
        .await;
    assert_eq!(verified.status, StatusCode::OK);
    assert_eq!(verified.body["message"], "Bank transfer verified successfully");
    assert_eq!(verified.body["invoice"]["status"], "paid");

    let late_upload = app
        .multipart(
            "/api/payments/bank-transfer",
            &[("invoiceId", id)],
            &[("transferProof", "again.jpg", PNG)],
        )
        .await;
    assert_eq!(late_upload.status, StatusCode::BAD_REQUEST);
    assert_eq!(late_upload.body["message"], "Invoice is already paid");
}

#[tokio::test]
async fn payment_history_is_private() {
    let app = TestApp::new();
    let (owner, owner_id) = app.register("amaka@example.com").await;
    let (stranger, _) = app.register("tunde@example.com").await;
    app.create_invoice(&owner, None).await;
    app.create_invoice(&owner, None).await;

    let own = app
        .get(&format!("/api/payments/history/{owner_id}"), Some(&owner))
        .await;
    assert_eq!(own.status, StatusCode::OK);
    assert_eq!(own.body.as_array().unwrap().len(), 2);

    let other = app
        .get(&format!("/api/payments/history/{owner_id}"), Some(&stranger))
        .await;
    assert_eq!(other.status, StatusCode::FORBIDDEN);
}
