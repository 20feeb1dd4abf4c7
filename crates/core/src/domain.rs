use std::fmt;

use serde::{Deserialize, Serialize};

/// Version of the serialized item list envelope. Bumped only for additive changes.
pub const ITEM_SCHEMA_VERSION: u32 = 1;

/// File extension every stored image carries.
pub const IMAGE_EXTENSION: &str = ".jpg";

/// Name of the fallback image served when a requested blob is absent.
pub const DEFAULT_IMAGE: &str = "default.jpg";

/// A normalized, uniquely named grouping for items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Input to an ingestion: the item fields plus the raw image upload.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub category: String,
    pub image: Vec<u8>,
}

impl NewItem {
    pub fn new(name: impl Into<String>, category: impl Into<String>, image: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            image,
        }
    }
}

/// Read-time join of an item with its category name and image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemView {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub image_name: String,
}

/// Wire envelope for item collections: `{"version": 1, "items": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemList {
    #[serde(default = "default_schema_version")]
    pub version: u32,
    pub items: Vec<ItemView>,
}

fn default_schema_version() -> u32 {
    ITEM_SCHEMA_VERSION
}

impl From<Vec<ItemView>> for ItemList {
    fn from(items: Vec<ItemView>) -> Self {
        Self {
            version: ITEM_SCHEMA_VERSION,
            items,
        }
    }
}

/// Summary counts for the status view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShelfStats {
    pub total_items: usize,
    pub total_categories: usize,
}

/// Steps of an ingestion, in order. Used to report where a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Validating,
    BlobWriting,
    TxOpen,
    CategoryResolving,
    ItemInserting,
    Committing,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStage::Validating => "validating",
            IngestStage::BlobWriting => "writing image",
            IngestStage::TxOpen => "opening transaction",
            IngestStage::CategoryResolving => "resolving category",
            IngestStage::ItemInserting => "inserting item",
            IngestStage::Committing => "committing",
        }
    }

    /// Whether a failure at this stage happened after the transaction was opened.
    pub fn is_transactional(&self) -> bool {
        !matches!(self, IngestStage::Validating | IngestStage::BlobWriting)
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
