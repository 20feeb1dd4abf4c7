pub mod category;
pub mod schema;

use std::path::Path;
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

use crate::deadline::Deadline;
use crate::domain::*;
use crate::error::{Error, Result};

/// Type alias for the connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Item + category join shared by every read projection.
const ITEM_VIEW_SELECT: &str = "SELECT items.id, items.name, categories.name, items.image_name
     FROM items JOIN categories ON items.category_id = categories.id";

/// Pool sizing and lock-wait settings for a [`Catalog`].
#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    pub max_size: u32,
    pub busy_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_size: 8,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// SQLite-backed catalog for categories and items.
#[derive(Clone)]
pub struct Catalog {
    pool: DbPool,
    busy_timeout: Duration,
}

impl Catalog {
    /// Open or create a catalog at the given path with WAL mode.
    pub fn open(path: &Path, options: PoolOptions) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let busy_timeout = options.busy_timeout;
        let manager = SqliteConnectionManager::file(path).with_init(move |c| {
            c.pragma_update(None, "foreign_keys", "ON")?;
            c.busy_timeout(busy_timeout)
        });
        let pool = Pool::builder().max_size(options.max_size).build(manager)?;

        let catalog = Self { pool, busy_timeout };
        {
            let conn = catalog.conn()?;
            conn.pragma_update(None, "journal_mode", "WAL")?;
            schema::initialize(&conn)?;
        }
        tracing::info!(path = %path.display(), pool_size = options.max_size, "opened catalog");
        Ok(catalog)
    }

    /// Open an in-memory catalog (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let busy_timeout = PoolOptions::default().busy_timeout;
        let manager = SqliteConnectionManager::memory().with_init(|c| {
            c.pragma_update(None, "foreign_keys", "ON")
        });
        // Every in-memory connection is its own database, so keep exactly one alive.
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?;

        let catalog = Self { pool, busy_timeout };
        schema::initialize(&*catalog.conn()?)?;
        Ok(catalog)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    // ── Transactions ─────────────────────────────────────────────────

    /// Run `f` inside an IMMEDIATE transaction, committing on success.
    ///
    /// The write lock is taken at BEGIN, so lookups made through `tx` cannot be
    /// invalidated by another writer before commit. Any error from `f` drops the
    /// transaction, which rolls it back. While `deadline` is bounded, lock waits are
    /// clamped to the time remaining.
    pub fn write<T, F>(&self, deadline: Deadline, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        deadline.check(IngestStage::TxOpen)?;
        let mut conn = self.conn()?;

        let clamped = match deadline.remaining() {
            Some(left) if left < self.busy_timeout => {
                conn.busy_timeout(left)?;
                true
            }
            _ => false,
        };

        let result = (|| -> Result<T> {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|e| {
                    let err = Error::from(e);
                    // A clamped lock wait that gives up has spent the caller's budget.
                    if err.is_retryable() && clamped {
                        Error::DeadlineExceeded(IngestStage::TxOpen)
                    } else {
                        err
                    }
                })?;
            let value = f(&tx)?;
            deadline.check(IngestStage::Committing)?;
            tx.commit()?;
            Ok(value)
        })();

        if clamped {
            if let Err(e) = conn.busy_timeout(self.busy_timeout) {
                tracing::warn!(error = %e, "failed to restore busy timeout");
            }
        }
        result
    }

    // ── Items ────────────────────────────────────────────────────────

    /// Insert one item row on the given connection or transaction.
    pub fn insert_item(
        conn: &Connection,
        name: &str,
        category_id: i64,
        image_name: &str,
    ) -> Result<i64> {
        conn.execute(
            "INSERT INTO items (name, category_id, image_name) VALUES (?1, ?2, ?3)",
            params![name, category_id, image_name],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_item(&self, id: i64) -> Result<ItemView> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("{ITEM_VIEW_SELECT} WHERE items.id = ?1"),
            params![id],
            row_to_view,
        )
        .optional()?
        .ok_or(Error::ItemNotFound(id))
    }

    pub fn list_items(&self) -> Result<Vec<ItemView>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{ITEM_VIEW_SELECT} ORDER BY items.id"))?;
        let items = stmt
            .query_map([], row_to_view)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Items whose name contains `keyword` (case-sensitive, unanchored).
    pub fn search_items(&self, keyword: &str) -> Result<Vec<ItemView>> {
        if keyword.is_empty() {
            return self.list_items();
        }
        let conn = self.conn()?;
        // instr() is byte-exact, unlike LIKE which folds ASCII case.
        let mut stmt = conn.prepare(&format!(
            "{ITEM_VIEW_SELECT} WHERE instr(items.name, ?1) > 0 ORDER BY items.id"
        ))?;
        let items = stmt
            .query_map(params![keyword], row_to_view)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// The stored image name of an item, if the item exists.
    pub fn image_name_for_item(&self, id: i64) -> Result<Option<String>> {
        let conn = self.conn()?;
        let name = conn
            .query_row(
                "SELECT image_name FROM items WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name)
    }

    pub fn count_items(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ── Categories ───────────────────────────────────────────────────

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        category::list(&*self.conn()?)
    }

    pub fn count_categories(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get item and category counts in a single query for the status view.
    pub fn stats_summary(&self) -> Result<ShelfStats> {
        let conn = self.conn()?;
        let stats = conn.query_row(
            "SELECT (SELECT COUNT(*) FROM items), (SELECT COUNT(*) FROM categories)",
            [],
            |row| {
                Ok(ShelfStats {
                    total_items: row.get::<_, i64>(0)? as usize,
                    total_categories: row.get::<_, i64>(1)? as usize,
                })
            },
        )?;
        Ok(stats)
    }

    /// Run raw SQL against a pooled connection.
    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn()?.execute_batch(sql)?;
        Ok(())
    }
}

fn row_to_view(row: &Row<'_>) -> rusqlite::Result<ItemView> {
    Ok(ItemView {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        image_name: row.get(3)?,
    })
}
