use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Normalized, schema-stable representation of one catalog item
///
/// Every field is always present in the serialized form; fields the catalog
/// never supplies (`marketing_tags`, `view360`, `video`) are empty sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Normalization time, seconds since the Unix epoch
    pub timestamp: i64,

    /// Unique item code
    #[serde(rename = "RPC")]
    pub rpc: String,

    pub url: String,
    pub title: String,
    pub marketing_tags: Vec<String>,
    pub brand: String,

    /// Listing-time category title
    pub section: String,

    pub price_data: PriceData,
    pub stock: Stock,
    pub assets: Assets,
    /// Fixed keys first, then variant dimensions in upstream order
    pub metadata: IndexMap<String, String>,

    /// Number of variants the item was offered in
    pub variants: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceData {
    pub current: f64,
    pub original: f64,
    pub sale_tag: String,
}

impl PriceData {
    pub fn is_on_sale(&self) -> bool {
        self.current < self.original
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    pub in_stock: bool,
    pub count: u64,
}

impl Stock {
    pub fn from_count(count: u64) -> Self {
        Self {
            in_stock: count > 0,
            count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Assets {
    pub main_image: String,
    pub set_images: Vec<String>,
    pub view360: Vec<String>,
    pub video: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CanonicalRecord {
        CanonicalRecord {
            timestamp: 1_700_000_000,
            rpc: "123".to_string(),
            url: "https://fix-price.com/catalog/item-123".to_string(),
            title: "Мяч".to_string(),
            marketing_tags: vec![],
            brand: String::new(),
            section: "Игрушки".to_string(),
            price_data: PriceData {
                current: 99.0,
                original: 99.0,
                sale_tag: String::new(),
            },
            stock: Stock::from_count(0),
            assets: Assets::default(),
            metadata: IndexMap::new(),
            variants: 1,
        }
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        let object = json.as_object().unwrap();

        for key in [
            "timestamp",
            "RPC",
            "url",
            "title",
            "marketing_tags",
            "brand",
            "section",
            "price_data",
            "stock",
            "assets",
            "metadata",
            "variants",
        ] {
            assert!(object.contains_key(key), "missing field {}", key);
        }
        assert_eq!(json["price_data"]["sale_tag"], "");
        assert_eq!(json["stock"]["in_stock"], false);
        assert!(json["assets"]["view360"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_stock_from_count() {
        assert!(Stock::from_count(3).in_stock);
        assert!(!Stock::from_count(0).in_stock);
    }
}
