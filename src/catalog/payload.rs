//! Raw upstream payload shapes
//!
//! The catalog API is loose about field presence and numeric encoding, so
//! every block is optional here and numbers are accepted either as JSON
//! numbers or as numeric strings. Defaults are applied by the normalizer,
//! not at this layer.

use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// One entry of a listing page
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingEntry {
    /// Item slug, used to build the detail request
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub category: Option<ListingCategory>,
}

/// Category block attached to a listing entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingCategory {
    #[serde(default)]
    pub title: Option<String>,
}

/// Full detail document for one item
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailPayload {
    #[serde(default)]
    pub id: Option<Value>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub sku: Option<Value>,

    /// Top-level price, used when a special-price block omits its own
    #[serde(default, deserialize_with = "flexible_number")]
    pub price: Option<f64>,

    #[serde(default, deserialize_with = "falsy_as_none")]
    pub special_price: Option<SpecialPrice>,

    #[serde(default)]
    pub brand: Option<Brand>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<Image>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: Vec<Property>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub variants: Vec<Variant>,
}

impl DetailPayload {
    /// Parses a detail document from a response body
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// Returns the item identifier as a string, if the payload carries one
    pub fn rpc(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Best available label for error reporting
    pub fn item_label(&self) -> String {
        self.rpc()
            .or_else(|| self.url.clone())
            .unwrap_or_else(|| "<unknown>".to_string())
    }
}

/// Special (discount) price block
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpecialPrice {
    #[serde(default, deserialize_with = "flexible_number")]
    pub price: Option<f64>,

    /// Remaining fields of the block, kept only to tell `{}` from a real block
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SpecialPrice {
    /// An empty object counts as "no special price"
    pub fn is_empty(&self) -> bool {
        self.price.is_none() && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Brand {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Image {
    #[serde(default)]
    pub src: Option<String>,
}

/// Free-form `{title, value}` characteristic
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Property {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub value: Value,
}

/// One purchasable configuration of an item
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    #[serde(default, deserialize_with = "flexible_number")]
    pub fix_price: Option<f64>,

    #[serde(default, deserialize_with = "flexible_number")]
    pub count: Option<f64>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub dimensions: IndexMap<String, Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: Vec<Property>,
}

impl Variant {
    /// Stock count of this variant; missing, negative or non-finite counts are 0
    pub fn stock_count(&self) -> u64 {
        match self.count {
            Some(c) if c.is_finite() && c > 0.0 => c as u64,
            _ => 0,
        }
    }
}

/// Renders a loose JSON scalar as text (`null` becomes `""`)
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberLike {
    Number(f64),
    Text(String),
}

fn flexible_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberLike>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberLike::Number(n)) => Ok(Some(n)),
        Some(NumberLike::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .replace(',', ".")
                .parse::<f64>()
                .map(Some)
                .map_err(|e| D::Error::custom(format!("invalid number {:?}: {}", s, e)))
        }
    }
}

/// Special-price block; `false`, `0`, `""` and `[]` mean "no block"
fn falsy_as_none<'de, D>(deserializer: D) -> Result<Option<SpecialPrice>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::Array(a)) if a.is_empty() => Ok(None),
        Some(block @ Value::Object(_)) => serde_json::from_value(block)
            .map(Some)
            .map_err(D::Error::custom),
        Some(other) => Err(D::Error::custom(format!(
            "specialPrice must be an object, got {}",
            other
        ))),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
