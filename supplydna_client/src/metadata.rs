//! NFT certificate metadata
//!
//! Metadata is derived from the component record plus the registration date
//! and pinned to IPFS before the mint transaction references it.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ComponentRecord;

pub const CERTIFICATE_IMAGE: &str =
    "https://via.placeholder.com/400x400/3498db/ffffff?text=SupplyDNA+Component";
pub const EXTERNAL_URL: &str = "https://supplydna.com";
pub const BACKGROUND_COLOR: &str = "3498db";

/// A single `{trait_type, value}` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub trait_type: String,
    pub value: String,
}

impl Attribute {
    fn new(trait_type: &str, value: impl Into<String>) -> Self {
        Self {
            trait_type: trait_type.to_string(),
            value: value.into(),
        }
    }
}

/// ERC-721 style metadata document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftMetadata {
    pub name: String,
    pub description: String,
    pub image: String,
    pub attributes: Vec<Attribute>,
    pub external_url: String,
    pub background_color: String,
}

impl NftMetadata {
    /// Metadata for `record` registered on `registered_on`
    pub fn for_component(record: &ComponentRecord, registered_on: NaiveDate) -> Self {
        Self {
            name: format!("SupplyDNA Component - {}", record.id),
            description: format!(
                "Component {} registered in SupplyDNA blockchain traceability system",
                record.id
            ),
            image: CERTIFICATE_IMAGE.to_string(),
            attributes: vec![
                Attribute::new("Component ID", record.id.as_str()),
                Attribute::new("Name", record.name.as_str()),
                Attribute::new("Supplier", record.supplier.as_str()),
                Attribute::new("Batch", record.batch.as_str()),
                Attribute::new("Manufacturing Date", record.date.as_str()),
                Attribute::new(
                    "Registration Date",
                    registered_on.format("%Y-%m-%d").to_string(),
                ),
            ],
            external_url: EXTERNAL_URL.to_string(),
            background_color: BACKGROUND_COLOR.to_string(),
        }
    }

    /// Metadata stamped with today's UTC date
    pub fn for_today(record: &ComponentRecord) -> Self {
        Self::for_component(record, Utc::now().date_naive())
    }

    pub fn attribute(&self, trait_type: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.trait_type == trait_type)
            .map(|a| a.value.as_str())
    }

    pub fn to_json(&self) -> serde_json::Value {
        // Plain string fields cannot fail to serialize.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
