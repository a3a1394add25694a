use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// One product/promotion row extracted from a file.
///
/// The five code/label fields are required: rows without them never reach a
/// file record. Upstream payloads may use camelCase names, which are accepted
/// as aliases. Deserialization is lenient: numbers are accepted where text is
/// expected and vice versa, text is trimmed, and a missing or unusable value
/// becomes blank (see [`Self::has_required_fields`]).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ExtractedProduct {
    #[serde(default, alias = "providerCode", deserialize_with = "lenient_text")]
    pub provider_code: String,
    #[serde(default, alias = "productCode", deserialize_with = "lenient_text")]
    pub product_code: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub brand: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub category: String,
    /// Free-text combination of the discount columns found in the source.
    #[serde(default, alias = "discountDescription", deserialize_with = "lenient_text")]
    pub discount_description: String,
    #[serde(
        default,
        alias = "minimumPurchaseQuantity",
        deserialize_with = "lenient_integer"
    )]
    pub minimum_purchase_quantity: Option<i64>,
    #[serde(default, alias = "offerConditions", deserialize_with = "lenient_optional_text")]
    pub offer_conditions: Option<String>,
}

fn text_from_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text_from_value(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text_from_value(Value::deserialize(deserializer)?).filter(|v| !v.is_empty()))
}

fn lenient_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

impl ExtractedProduct {
    /// Column order used for tabular exports.
    pub const COLUMNS: [&'static str; 8] = [
        "provider_code",
        "product_code",
        "description",
        "brand",
        "category",
        "discount_description",
        "minimum_purchase_quantity",
        "offer_conditions",
    ];

    /// Cell values in [`Self::COLUMNS`] order.
    pub fn to_row(&self) -> [String; 8] {
        [
            self.provider_code.clone(),
            self.product_code.clone(),
            self.description.clone(),
            self.brand.clone(),
            self.category.clone(),
            self.discount_description.clone(),
            self.minimum_purchase_quantity
                .map(|q| q.to_string())
                .unwrap_or_default(),
            self.offer_conditions.clone().unwrap_or_default(),
        ]
    }

    /// True when every required field carries non-blank text.
    pub fn has_required_fields(&self) -> bool {
        [
            &self.provider_code,
            &self.product_code,
            &self.description,
            &self.brand,
            &self.category,
        ]
        .iter()
        .all(|v| !v.trim().is_empty())
    }
}
