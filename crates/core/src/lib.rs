pub mod blob_store;
pub mod catalog;
pub mod config;
pub mod deadline;
pub mod domain;
pub mod error;
pub mod hasher;

use std::path::Path;
use std::time::Duration;

use blob_store::BlobStore;
use catalog::{category, Catalog, PoolOptions};
use config::ShelfConfig;
use deadline::Deadline;
use domain::*;
use error::{Error, Result};

/// Per-call controls for an ingestion. Unset fields fall back to the shelf's config.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Budget for the whole call, blob write included.
    pub deadline: Option<Deadline>,
    /// Retries of the transactional part after a retryable conflict.
    pub retries: Option<u32>,
}

/// The main entry point for the itemshelf library.
///
/// A `Shelf` is `Send + Sync`; share it across handler threads behind an `Arc`.
pub struct Shelf {
    catalog: Catalog,
    blobs: BlobStore,
    config: ShelfConfig,
}

impl Shelf {
    /// Open or create the catalog and blob directory described by `config`.
    pub fn open(config: &ShelfConfig) -> Result<Self> {
        config.validate()?;
        let catalog = Catalog::open(
            &config.database_path,
            PoolOptions {
                max_size: config.pool_size,
                busy_timeout: Duration::from_millis(config.busy_timeout_ms),
            },
        )?;
        let blobs = BlobStore::open(&config.image_dir)?;
        Ok(Self {
            catalog,
            blobs,
            config: config.clone(),
        })
    }

    /// Open a shelf with default settings rooted at `root`.
    pub fn open_at(root: &Path) -> Result<Self> {
        Self::open(&ShelfConfig::rooted_at(root))
    }

    pub fn config(&self) -> &ShelfConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// Add an item: store its image, resolve its category, insert the row.
    /// Returns the new item id.
    pub fn ingest(&self, name: &str, category: &str, image: &[u8]) -> Result<i64> {
        self.run_ingest(name, category, image, IngestOptions::default())
    }

    pub fn ingest_with(&self, item: &NewItem, options: IngestOptions) -> Result<i64> {
        self.run_ingest(&item.name, &item.category, &item.image, options)
    }

    fn run_ingest(
        &self,
        name: &str,
        category_name: &str,
        image: &[u8],
        options: IngestOptions,
    ) -> Result<i64> {
        let mut stage = IngestStage::Validating;
        let result = self.ingest_stages(name, category_name, image, options, &mut stage);
        if let Err(e) = &result {
            if stage.is_transactional() {
                tracing::warn!(stage = %stage, error = %e, name = %name, "ingest rolled back");
            } else {
                tracing::debug!(stage = %stage, error = %e, name = %name, "ingest rejected");
            }
        }
        result
    }

    /// Run the pipeline, leaving `stage` at the step that was running when it stopped.
    fn ingest_stages(
        &self,
        name: &str,
        category_name: &str,
        image: &[u8],
        options: IngestOptions,
        stage: &mut IngestStage,
    ) -> Result<i64> {
        let deadline = options
            .deadline
            .unwrap_or_else(|| Deadline::from_millis(self.config.ingest_timeout_ms));
        let retries = options.retries.unwrap_or(self.config.conflict_retries);

        validate(name, category_name, image)?;

        // Pre-transaction: a failure here never touches the database.
        *stage = IngestStage::BlobWriting;
        let blob_deadline =
            deadline.min(Deadline::from_millis(self.config.blob_write_timeout_ms));
        let image_name = self.blobs.put_with_deadline(image, blob_deadline)?;

        let mut attempt = 0;
        loop {
            match self.commit_item(name, category_name, &image_name, deadline, stage) {
                Err(e) if e.is_retryable() && attempt < retries => {
                    attempt += 1;
                    tracing::warn!(
                        category = %category_name,
                        attempt,
                        stage = %stage,
                        error = %e,
                        "retrying ingest after conflict"
                    );
                }
                other => return other,
            }
        }
    }

    /// One transactional attempt. The image is already stored and stays stored
    /// even if this rolls back.
    fn commit_item(
        &self,
        name: &str,
        category_name: &str,
        image_name: &str,
        deadline: Deadline,
        stage: &mut IngestStage,
    ) -> Result<i64> {
        *stage = IngestStage::TxOpen;
        let item_id = self.catalog.write(deadline, |tx| {
            *stage = IngestStage::CategoryResolving;
            deadline.check(*stage)?;
            let category_id = category::resolve_or_create(tx, category_name)?;

            *stage = IngestStage::ItemInserting;
            deadline.check(*stage)?;
            let item_id = Catalog::insert_item(tx, name, category_id, image_name)?;

            *stage = IngestStage::Committing;
            Ok(item_id)
        })?;

        tracing::info!(
            item_id,
            name = %name,
            category = %category_name,
            image_name = %image_name,
            "item received"
        );
        Ok(item_id)
    }

    pub fn get_item(&self, id: i64) -> Result<ItemView> {
        self.catalog.get_item(id)
    }

    pub fn list_items(&self) -> Result<Vec<ItemView>> {
        self.catalog.list_items()
    }

    /// Items whose name contains `keyword`, case-sensitively. Empty matches all.
    pub fn search_items(&self, keyword: &str) -> Result<Vec<ItemView>> {
        self.catalog.search_items(keyword)
    }

    /// Image bytes for `blob_id`, or the default image if it is not stored.
    pub fn get_image(&self, blob_id: &str) -> Result<Vec<u8>> {
        self.blobs.get_or_default(blob_id)
    }

    /// Image bytes for an item, or the default image if the item or its blob is gone.
    pub fn item_image(&self, item_id: i64) -> Result<Vec<u8>> {
        match self.catalog.image_name_for_item(item_id)? {
            Some(image_name) => self.blobs.get_or_default(&image_name),
            None => {
                tracing::debug!(item_id, "no item for image request, serving default");
                self.blobs.get(DEFAULT_IMAGE)
            }
        }
    }

    pub fn install_default_image(&self, bytes: &[u8]) -> Result<()> {
        self.blobs.install_default(bytes)
    }

    pub fn categories(&self) -> Result<Vec<Category>> {
        self.catalog.list_categories()
    }

    /// Get catalog summary statistics.
    pub fn status(&self) -> Result<ShelfStats> {
        self.catalog.stats_summary()
    }
}

fn validate(name: &str, category: &str, image: &[u8]) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::MissingField("name"));
    }
    if category.trim().is_empty() {
        return Err(Error::MissingField("category"));
    }
    if image.is_empty() {
        return Err(Error::EmptyImage);
    }
    Ok(())
}
