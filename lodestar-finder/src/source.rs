//! Backing-store bulk reads.
//!
//! A [`CatalogSource`] performs the three bulk queries a populate needs.
//! Each call is one full read of the relevant table; the coordinator
//! consumes the rows in a single forward pass while building the index.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use lodestar_core::{CatalogRow, EnumValueRow, FieldRow, SourceError};

/// Result type for backing-store reads.
pub type SourceResult<T> = Result<T, SourceError>;

/// Bulk-read access to the backing store.
///
/// Implementations wrap whatever the host persists catalogs in (a SQL
/// store, an ORM layer, a remote service). Errors surface as
/// [`SourceError`] and are never cached: a failed bulk load leaves the
/// shard cold so the next read retries.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// List all catalogs with id, type, and code.
    async fn catalogs(&self) -> SourceResult<Vec<CatalogRow>>;

    /// List all fields with id, code, and owning catalog id.
    async fn fields(&self) -> SourceResult<Vec<FieldRow>>;

    /// List all field enum values with id, external key, owning field id,
    /// and owning field code (a join on the field table).
    async fn enum_values(&self) -> SourceResult<Vec<EnumValueRow>>;
}

/// In-memory source over fixed rows.
///
/// Serves embedders whose catalog data is static, and doubles as the test
/// double for the engine: per-table load counters let tests assert the
/// at-most-one-load guarantee.
#[derive(Debug, Default)]
pub struct StaticCatalogSource {
    catalogs: Vec<CatalogRow>,
    fields: Vec<FieldRow>,
    enum_values: Vec<EnumValueRow>,
    catalog_loads: AtomicU64,
    field_loads: AtomicU64,
    enum_loads: AtomicU64,
}

impl StaticCatalogSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the catalog rows.
    pub fn with_catalogs(mut self, rows: Vec<CatalogRow>) -> Self {
        self.catalogs = rows;
        self
    }

    /// Replace the field rows.
    pub fn with_fields(mut self, rows: Vec<FieldRow>) -> Self {
        self.fields = rows;
        self
    }

    /// Replace the enum value rows.
    pub fn with_enum_values(mut self, rows: Vec<EnumValueRow>) -> Self {
        self.enum_values = rows;
        self
    }

    /// Number of times `catalogs()` has run.
    pub fn catalog_load_count(&self) -> u64 {
        self.catalog_loads.load(Ordering::SeqCst)
    }

    /// Number of times `fields()` has run.
    pub fn field_load_count(&self) -> u64 {
        self.field_loads.load(Ordering::SeqCst)
    }

    /// Number of times `enum_values()` has run.
    pub fn enum_load_count(&self) -> u64 {
        self.enum_loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSource for StaticCatalogSource {
    async fn catalogs(&self) -> SourceResult<Vec<CatalogRow>> {
        self.catalog_loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.catalogs.clone())
    }

    async fn fields(&self) -> SourceResult<Vec<FieldRow>> {
        self.field_loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.fields.clone())
    }

    async fn enum_values(&self) -> SourceResult<Vec<EnumValueRow>> {
        self.enum_loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.enum_values.clone())
    }
}
