//! Parsing of the extraction response into [`ExtractedProduct`] rows.
//!
//! The envelope is strict: the body must be a JSON object, and `products`
//! must be an array when present. Rows go through the lenient
//! [`ExtractedProduct`] deserializer. A row that is not an object, fails to
//! deserialize, or lacks a required field is dropped.

use serde_json::Value;

use promo_core::models::ExtractedProduct;

use crate::error::ExtractionError;

/// Rows kept from a response, plus how many were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedProducts {
    pub products: Vec<ExtractedProduct>,
    pub dropped: usize,
}

pub fn parse_products(body: &[u8]) -> Result<ParsedProducts, ExtractionError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        ExtractionError::UpstreamMalformedResponse(format!("Response is not valid JSON: {}", e))
    })?;
    parse_products_value(value)
}

pub fn parse_products_value(value: Value) -> Result<ParsedProducts, ExtractionError> {
    let Value::Object(mut envelope) = value else {
        return Err(ExtractionError::UpstreamMalformedResponse(
            "Response is not a JSON object".to_string(),
        ));
    };

    let rows = match envelope.remove("products") {
        None | Some(Value::Null) => return Ok(ParsedProducts::default()),
        Some(Value::Array(rows)) => rows,
        Some(_) => {
            return Err(ExtractionError::UpstreamMalformedResponse(
                "\"products\" is not an array".to_string(),
            ))
        }
    };

    let total = rows.len();
    let products: Vec<ExtractedProduct> = rows
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|row| serde_json::from_value::<ExtractedProduct>(row).ok())
        .filter(ExtractedProduct::has_required_fields)
        .collect();

    Ok(ParsedProducts {
        dropped: total - products.len(),
        products,
    })
}
