//! Detail payload normalization
//!
//! Turns one raw detail document plus its listing-time category title into a
//! [`CanonicalRecord`]. Normalization is pure: the only input besides the
//! payload is the timestamp, which [`Normalizer::normalize`] reads from the
//! clock and [`Normalizer::normalize_at`] takes explicitly.

mod metadata;
mod price;

pub use metadata::{build_metadata, build_title, COUNTRY_PROPERTY, VARIANT_PROPERTY};
pub use price::{discount_percent, resolve_price};

use crate::catalog::payload::{DetailPayload, Variant};
use crate::catalog::{Assets, CanonicalRecord, Stock};
use crate::NormalizationError;
use chrono::Utc;

/// Maps detail payloads to canonical records
#[derive(Debug, Clone)]
pub struct Normalizer {
    catalog_url: String,
}

impl Normalizer {
    /// Creates a normalizer that builds item URLs under `catalog_url`
    pub fn new(catalog_url: impl Into<String>) -> Self {
        let catalog_url = catalog_url.into();
        Self {
            catalog_url: catalog_url.trim_end_matches('/').to_string(),
        }
    }

    /// Normalizes a payload, stamping it with the current time
    pub fn normalize(
        &self,
        payload: &DetailPayload,
        section: &str,
    ) -> Result<CanonicalRecord, NormalizationError> {
        self.normalize_at(payload, section, Utc::now().timestamp())
    }

    /// Normalizes a payload with an explicit timestamp
    ///
    /// # Errors
    ///
    /// - `MissingField` if the item has no id, no url, or its first variant
    ///   has no price
    /// - `NoVariants` if the variant list is empty
    /// - `InvalidPrice` for negative or non-finite prices
    pub fn normalize_at(
        &self,
        payload: &DetailPayload,
        section: &str,
        timestamp: i64,
    ) -> Result<CanonicalRecord, NormalizationError> {
        let rpc = payload
            .rpc()
            .ok_or_else(|| NormalizationError::MissingField {
                item: payload.item_label(),
                field: "id",
            })?;

        let first = payload
            .variants
            .first()
            .ok_or_else(|| NormalizationError::NoVariants { item: rpc.clone() })?;

        let original = first
            .fix_price
            .ok_or_else(|| NormalizationError::MissingField {
                item: rpc.clone(),
                field: "variants[0].fixPrice",
            })?;

        let slug = payload
            .url
            .as_deref()
            .map(|u| u.trim_start_matches('/'))
            .filter(|u| !u.is_empty())
            .ok_or_else(|| NormalizationError::MissingField {
                item: rpc.clone(),
                field: "url",
            })?;

        let price_data = resolve_price(payload, original, &rpc)?;

        let count = payload
            .variants
            .iter()
            .map(Variant::stock_count)
            .fold(0u64, u64::saturating_add);

        let set_images: Vec<String> = payload
            .images
            .iter()
            .map(|image| image.src.clone().unwrap_or_default())
            .collect();

        Ok(CanonicalRecord {
            timestamp,
            url: format!("{}/{}", self.catalog_url, slug),
            title: build_title(payload),
            marketing_tags: Vec::new(),
            brand: payload
                .brand
                .as_ref()
                .and_then(|b| b.title.clone())
                .unwrap_or_default(),
            section: section.to_string(),
            price_data,
            stock: Stock::from_count(count),
            assets: Assets {
                main_image: set_images.first().cloned().unwrap_or_default(),
                set_images,
                view360: Vec::new(),
                video: Vec::new(),
            },
            metadata: build_metadata(payload, &rpc),
            variants: payload.variants.len(),
            rpc,
        })
    }
}
