//! Catalog data model
//!
//! - `CategoryId` / `ItemReference`: crawl inputs and listing output
//! - payload types: the raw listing and detail documents
//! - `CanonicalRecord`: the normalized output handed to sinks

mod category;
pub mod payload;
mod record;

pub use category::{CategoryId, ItemReference};
pub use payload::{DetailPayload, ListingEntry};
pub use record::{Assets, CanonicalRecord, PriceData, Stock};
