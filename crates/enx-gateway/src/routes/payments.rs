use std::path::Path;

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use chrono::Utc;
use enx_billing::{Invoice, InvoiceStatus, PaymentMethod};
use enx_logistics::ShipmentPaymentStatus;
use enx_platform::contracts::{
    InitializePaymentRequest, VerifyBankTransferRequest, VerifyPaymentRequest,
};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::{
    auth::{AdminUser, AuthUser, require_owner_or_admin},
    error::ApiError,
    extract::{ApiJson, ApiPath},
    notify,
    routes::invoices::load_invoice,
    state::AppState,
    validation::{Checks, parse_id},
};

const PROOF_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

fn invoice_id_rule(checks: &mut Checks, raw: Option<&str>) -> Option<uuid::Uuid> {
    match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => checks.id("invoiceId", Some(raw), "Invalid invoice ID"),
        _ => {
            checks.fail("invoiceId", "Invoice ID is required");
            None
        }
    }
}

/// Paid invoices propagate to their shipment as a separate write.
/// A failure is logged; the invoice stays paid.
async fn settle_shipment(state: &AppState, invoice: &Invoice) {
    let Some(shipment_id) = invoice.shipment_id else {
        return;
    };
    match state
        .shipments
        .set_payment_status(shipment_id, ShipmentPaymentStatus::Paid)
        .await
    {
        Ok(true) => {}
        Ok(false) => warn!(
            shipment_id = %shipment_id,
            "paid invoice references a missing shipment"
        ),
        Err(err) => warn!(
            error = %err,
            shipment_id = %shipment_id,
            invoice_number = %invoice.invoice_number,
            "failed to mark shipment paid"
        ),
    }
}

pub async fn initialize(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(payload): ApiJson<InitializePaymentRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut checks = Checks::new();
    let invoice_id = invoice_id_rule(&mut checks, payload.invoice_id.as_deref());
    checks.finish()?;
    let Some(invoice_id) = invoice_id else {
        return Err(ApiError::bad_request("Invoice ID is required"));
    };

    let mut invoice = load_invoice(&state, invoice_id).await?;
    invoice.ensure_payable()?;

    let now = Utc::now();
    let reference = format!("ENX{}", now.timestamp_millis());
    let session = state
        .payments
        .initialize(&invoice.customer_email, invoice.amount_minor()?, &reference)
        .await?;

    invoice.payment_reference = Some(session.reference.clone());
    invoice.updated_at = now;
    state.invoices.save(&invoice).await?;
    info!(
        invoice_number = %invoice.invoice_number,
        reference = %session.reference,
        initiated_by = %caller.principal.id,
        "card payment initialized"
    );

    Ok(Json(json!({
        "message": "Payment initialized",
        "reference": session.reference,
        "authorizationUrl": session.authorization_url,
        "accessCode": session.access_code,
        "publicKey": state.payments.public_key(),
    })))
}

pub async fn verify(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<VerifyPaymentRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut checks = Checks::new();
    let reference = checks.required(
        "reference",
        payload.reference.as_deref(),
        "Payment reference is required",
    );
    let invoice_id = invoice_id_rule(&mut checks, payload.invoice_id.as_deref());
    checks.finish()?;
    let (Some(reference), Some(invoice_id)) = (reference, invoice_id) else {
        return Err(ApiError::bad_request("Validation failed"));
    };

    let verification = state.payments.verify(&reference).await?;
    if !verification.is_success() {
        return Err(ApiError::PaymentVerificationFailed {
            message: "Payment verification failed".into(),
            details: verification.raw,
        });
    }

    let mut invoice = load_invoice(&state, invoice_id).await?;
    if invoice.status == InvoiceStatus::Paid {
        if invoice.payment_reference.as_deref() == Some(reference.as_str()) {
            return Ok(Json(json!({
                "message": "Payment verified successfully",
                "invoice": invoice,
            })));
        }
        invoice.ensure_payable()?;
    }
    if invoice.payment_reference.as_deref() != Some(reference.as_str()) {
        warn!(
            invoice_number = %invoice.invoice_number,
            reference = %reference,
            "payment reference was not issued for this invoice"
        );
        return Err(ApiError::PaymentVerificationFailed {
            message: "Payment reference does not match this invoice".into(),
            details: verification.raw,
        });
    }

    let expected = invoice.amount_minor()?;
    if verification.amount.is_some_and(|charged| charged < expected) {
        return Err(ApiError::PaymentVerificationFailed {
            message: "Payment amount does not cover the invoice".into(),
            details: verification.raw,
        });
    }

    invoice.mark_paid(PaymentMethod::Card, Some(reference), Utc::now());
    state.invoices.save(&invoice).await?;
    info!(invoice_number = %invoice.invoice_number, "card payment verified");

    settle_shipment(&state, &invoice).await;
    notify::payment_confirmation(&state.messenger, &invoice);

    Ok(Json(json!({
        "message": "Payment verified successfully",
        "invoice": invoice,
    })))
}

struct TransferProof {
    extension: String,
    bytes: Vec<u8>,
}

pub async fn bank_transfer(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let mut multipart = multipart?;
    let max_bytes = state.settings.max_upload_bytes;
    let mut invoice_id = None;
    let mut proof = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request(err.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "invoiceId" => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| ApiError::bad_request(err.body_text()))?;
                invoice_id = Some(text);
            }
            "transferProof" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                if file_name.is_empty() {
                    continue;
                }
                let extension = Path::new(&file_name)
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(str::to_ascii_lowercase)
                    .filter(|ext| PROOF_EXTENSIONS.contains(&ext.as_str()))
                    .ok_or_else(|| ApiError::bad_request("Only image files are allowed!"))?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::bad_request("File too large. Maximum size is 5MB"))?;
                if bytes.len() > max_bytes {
                    return Err(ApiError::bad_request("File too large. Maximum size is 5MB"));
                }
                if !bytes.is_empty() {
                    proof = Some(TransferProof {
                        extension,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }

    let Some(proof) = proof else {
        return Err(ApiError::bad_request("Please upload proof of transfer"));
    };
    let mut checks = Checks::new();
    let invoice_id = invoice_id_rule(&mut checks, invoice_id.as_deref());
    checks.finish()?;
    let Some(invoice_id) = invoice_id else {
        return Err(ApiError::bad_request("Invoice ID is required"));
    };

    let mut invoice = load_invoice(&state, invoice_id).await?;
    invoice.ensure_payable()?;

    let now = Utc::now();
    let uploads_dir = &state.settings.uploads_dir;
    tokio::fs::create_dir_all(uploads_dir)
        .await
        .map_err(|err| anyhow::anyhow!("failed to prepare uploads directory: {err}"))?;
    let path = uploads_dir.join(format!("{}.{}", now.timestamp_millis(), proof.extension));
    tokio::fs::write(&path, &proof.bytes)
        .await
        .map_err(|err| anyhow::anyhow!("failed to store transfer proof: {err}"))?;

    invoice.submit_transfer_proof(path.to_string_lossy().into_owned(), now)?;
    state.invoices.save(&invoice).await?;
    info!(
        invoice_number = %invoice.invoice_number,
        proof = %path.display(),
        "bank transfer proof submitted"
    );

    Ok(Json(json!({
        "message": "Proof of transfer submitted successfully. Your payment will be verified shortly.",
        "invoice": invoice,
    })))
}

pub async fn verify_bank_transfer(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(invoice_id): ApiPath<String>,
    ApiJson(payload): ApiJson<VerifyBankTransferRequest>,
) -> Result<Json<Value>, ApiError> {
    let invoice_id = parse_id(&invoice_id, "Invalid invoice ID")?;
    let mut checks = Checks::new();
    checks.check(
        payload.verified.is_some(),
        "verified",
        "Verified must be true or false",
    );
    checks.finish()?;
    let verified = payload.verified.unwrap_or(false);

    let mut invoice = load_invoice(&state, invoice_id).await?;
    let notes = payload.notes.filter(|notes| !notes.trim().is_empty());
    invoice.review_transfer(verified, notes, admin.principal.id, Utc::now())?;
    state.invoices.save(&invoice).await?;
    info!(
        invoice_number = %invoice.invoice_number,
        verified,
        reviewer = %admin.principal.id,
        "bank transfer reviewed"
    );

    let message = if verified {
        settle_shipment(&state, &invoice).await;
        notify::payment_confirmation(&state.messenger, &invoice);
        "Bank transfer verified successfully"
    } else {
        "Bank transfer rejected successfully"
    };

    Ok(Json(json!({
        "message": message,
        "invoice": invoice,
    })))
}

pub async fn history(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(user_id): ApiPath<String>,
) -> Result<Json<Vec<Invoice>>, ApiError> {
    let user_id = parse_id(&user_id, "Invalid user ID")?;
    require_owner_or_admin(&caller.principal, Some(user_id))?;
    Ok(Json(state.invoices.list_for_customer(user_id).await?))
}
