use crate::catalog::payload::{value_to_text, DetailPayload};
use indexmap::IndexMap;

/// Property title marking a size/colour variant label
pub const VARIANT_PROPERTY: &str = "Вариант";

/// Property title holding the country of origin
pub const COUNTRY_PROPERTY: &str = "Страна производства";

pub const DESCRIPTION_KEY: &str = "__description";
pub const SKU_KEY: &str = "Артикул";
pub const RPC_KEY: &str = "Код товара";

/// Base title with every variant label appended as `", <value>"`
///
/// Labels are appended in variant order, then property order within a
/// variant, once per matching property.
pub fn build_title(payload: &DetailPayload) -> String {
    let mut title = payload.title.clone().unwrap_or_default();
    for variant in &payload.variants {
        for property in &variant.properties {
            if property.title.as_deref() == Some(VARIANT_PROPERTY) {
                title.push_str(", ");
                title.push_str(&value_to_text(&property.value));
            }
        }
    }
    title
}

/// Metadata map: fixed keys first, then every variant's dimensions
///
/// Dimensions are merged in variant order and a later variant overwrites an
/// earlier one on key collision.
pub fn build_metadata(payload: &DetailPayload, rpc: &str) -> IndexMap<String, String> {
    let mut metadata = IndexMap::new();

    metadata.insert(
        DESCRIPTION_KEY.to_string(),
        payload.description.clone().unwrap_or_default(),
    );
    metadata.insert(
        SKU_KEY.to_string(),
        payload.sku.as_ref().map(value_to_text).unwrap_or_default(),
    );
    metadata.insert(RPC_KEY.to_string(), rpc.to_string());
    metadata.insert(COUNTRY_PROPERTY.to_string(), country_of_origin(payload));

    for variant in &payload.variants {
        for (key, value) in &variant.dimensions {
            metadata.insert(key.clone(), value_to_text(value));
        }
    }

    metadata
}

/// Value of the first top-level property titled as the country of origin
fn country_of_origin(payload: &DetailPayload) -> String {
    payload
        .properties
        .iter()
        .find(|p| p.title.as_deref() == Some(COUNTRY_PROPERTY))
        .map(|p| value_to_text(&p.value))
        .unwrap_or_default()
}
