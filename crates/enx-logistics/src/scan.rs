use serde_json::Value;
use thiserror::Error;
use url::Url;

const JSON_KEYS: [&str; 3] = ["trackingNumber", "tracking_id", "id"];
const QUERY_KEYS: [&str; 3] = ["number", "id", "tracking"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
    Qr,
    Barcode,
    Auto,
}

impl ScanType {
    /// Unknown or missing hints fall back to auto-detection.
    pub fn from_hint(hint: Option<&str>) -> Self {
        match hint.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("qr") => ScanType::Qr,
            Some("barcode") => ScanType::Barcode,
            _ => ScanType::Auto,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScanError {
    #[error("Code is required")]
    EmptyCode,
    #[error("Could not extract tracking number from code")]
    NoTrackingNumber,
}

/// Pulls a tracking number out of scanned content. Barcodes are taken
/// verbatim; QR and auto scans try a JSON object, then a URL query, then
/// the raw text.
pub fn extract_tracking_number(code: &str, kind: ScanType) -> Result<String, ScanError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ScanError::EmptyCode);
    }

    if kind == ScanType::Barcode {
        return Ok(code.to_string());
    }

    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(code) {
        return JSON_KEYS
            .iter()
            .find_map(|key| fields.get(*key).and_then(scalar_text))
            .ok_or(ScanError::NoTrackingNumber);
    }

    if let Some(url) = parse_web_url(code) {
        return QUERY_KEYS
            .iter()
            .find_map(|key| {
                url.query_pairs()
                    .find(|(name, value)| &**name == *key && !value.trim().is_empty())
                    .map(|(_, value)| value.trim().to_string())
            })
            .ok_or(ScanError::NoTrackingNumber);
    }

    Ok(code.to_string())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn parse_web_url(code: &str) -> Option<Url> {
    let url = Url::parse(code).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_fields_in_priority_order() {
        let code = r#"{"id":"ENX000000003","trackingNumber":"ENX000000001"}"#;
        assert_eq!(
            extract_tracking_number(code, ScanType::Qr).unwrap(),
            "ENX000000001"
        );
        let code = r#"{"tracking_id":"ENX000000002","id":"ENX000000003"}"#;
        assert_eq!(
            extract_tracking_number(code, ScanType::Auto).unwrap(),
            "ENX000000002"
        );
    }

    #[test]
    fn json_without_known_fields_is_rejected() {
        assert_eq!(
            extract_tracking_number(r#"{"foo":"bar"}"#, ScanType::Qr),
            Err(ScanError::NoTrackingNumber)
        );
    }

    #[test]
    fn url_query_parameters() {
        let code = "https://enielexpress.com/tracking.html?number=ENX123456789";
        assert_eq!(
            extract_tracking_number(code, ScanType::Qr).unwrap(),
            "ENX123456789"
        );
        let code = "https://enielexpress.com/track?tracking=ENX987654321";
        assert_eq!(
            extract_tracking_number(code, ScanType::Auto).unwrap(),
            "ENX987654321"
        );
        assert_eq!(
            extract_tracking_number("https://enielexpress.com/track", ScanType::Qr),
            Err(ScanError::NoTrackingNumber)
        );
    }

    #[test]
    fn raw_text_fallback() {
        assert_eq!(
            extract_tracking_number("  ENX123456789 ", ScanType::Auto).unwrap(),
            "ENX123456789"
        );
        // numeric JSON is not an object, so it is taken as raw text
        assert_eq!(
            extract_tracking_number("123456", ScanType::Qr).unwrap(),
            "123456"
        );
    }

    #[test]
    fn barcode_is_verbatim() {
        let code = r#"{"trackingNumber":"ENX1"}"#;
        assert_eq!(extract_tracking_number(code, ScanType::Barcode).unwrap(), code);
    }

    #[test]
    fn empty_code() {
        assert_eq!(
            extract_tracking_number("   ", ScanType::Auto),
            Err(ScanError::EmptyCode)
        );
    }

    #[test]
    fn hint_parsing() {
        assert_eq!(ScanType::from_hint(Some("QR")), ScanType::Qr);
        assert_eq!(ScanType::from_hint(Some("barcode")), ScanType::Barcode);
        assert_eq!(ScanType::from_hint(Some("nfc")), ScanType::Auto);
        assert_eq!(ScanType::from_hint(None), ScanType::Auto);
    }
}
