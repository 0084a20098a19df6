use crate::core::error::MalformedPayloadError;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Extracts the top-level `price` field at full source precision.
///
/// Providers send the price either as a decimal string or as a JSON number; both
/// are accepted. The value must be strictly positive.
pub fn parse_price(body: &str) -> Result<Decimal, MalformedPayloadError> {
    let payload: Value = serde_json::from_str(body)
        .map_err(|e| MalformedPayloadError(format!("price payload is not JSON: {e}")))?;

    let raw = match payload.get("price") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(MalformedPayloadError(format!(
                "price field is not numeric: {other}"
            )));
        }
        None => return Err(missing_price(&payload)),
    };

    let price = Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|_| MalformedPayloadError(format!("price field is not numeric: {raw:?}")))?;

    if price <= Decimal::ZERO {
        return Err(MalformedPayloadError(format!(
            "price must be positive, got {price}"
        )));
    }
    Ok(price)
}

fn missing_price(payload: &Value) -> MalformedPayloadError {
    // Error payloads carry a message instead of a price.
    match payload.get("message").and_then(Value::as_str) {
        Some(message) => MalformedPayloadError(format!("price field missing: {message}")),
        None => MalformedPayloadError("price field missing".to_string()),
    }
}
