//! LODESTAR Core - Identifier and Row Types
//!
//! Pure data structures with no behavior. The finder engine in
//! `lodestar-finder` depends on this; nothing here touches a cache or a
//! backing store.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub mod error;

pub use error::{FilterError, FinderError, FinderResult, SourceError, StoreError};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Numeric primary key of a catalog, assigned by the backing store.
pub type CatalogId = i64;

/// Numeric primary key of a field within a catalog.
pub type FieldId = i64;

/// Numeric primary key of an enumerated field value.
pub type EnumValueId = i64;

/// Set of invalidation tags attached to a cached shard.
pub type TagSet = HashSet<String>;

// ============================================================================
// LOOKUP KINDS
// ============================================================================

/// Closed set of resolution operations the finder supports.
///
/// Each kind implies a fixed set of required criteria and a fixed scalar
/// return type; dispatch happens on this enum, never on the shape of a
/// criteria mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LookupKind {
    /// Catalog id by type + code.
    Id,
    /// Catalog type by id.
    Type,
    /// Catalog code by id.
    Code,
    /// Field id by catalog id + field code.
    FieldId,
    /// Enum value id by catalog id + field code + external id.
    FieldEnumId,
}

impl LookupKind {
    /// Human-readable name used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupKind::Id => "id",
            LookupKind::Type => "type",
            LookupKind::Code => "code",
            LookupKind::FieldId => "field id",
            LookupKind::FieldEnumId => "field enum id",
        }
    }
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// BULK ROWS
// ============================================================================

/// One catalog row from the backing store's bulk catalog query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRow {
    /// Primary key, strictly positive.
    pub id: CatalogId,
    /// Catalog type the row belongs to.
    pub catalog_type: String,
    /// Symbolic code. Catalogs without a code resolve by id only.
    pub code: Option<String>,
}

impl CatalogRow {
    pub fn new(id: CatalogId, catalog_type: impl Into<String>, code: Option<&str>) -> Self {
        Self {
            id,
            catalog_type: catalog_type.into(),
            code: code.map(str::to_owned),
        }
    }
}

/// One field row from the backing store's bulk field query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRow {
    pub id: FieldId,
    /// Symbolic code, unique within the owning catalog.
    pub code: String,
    /// Catalog that owns this field.
    pub catalog_id: CatalogId,
}

impl FieldRow {
    pub fn new(id: FieldId, code: impl Into<String>, catalog_id: CatalogId) -> Self {
        Self {
            id,
            code: code.into(),
            catalog_id,
        }
    }
}

/// One enum value row from the backing store's field-enum join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValueRow {
    pub id: EnumValueId,
    /// External key of the value, unique within the owning field.
    pub external_id: String,
    /// Field that owns this value.
    pub field_id: FieldId,
    /// Code of the owning field; rows whose field has no code are skipped
    /// during indexing, matching the join the backing store performs.
    pub field_code: Option<String>,
}

impl EnumValueRow {
    pub fn new(
        id: EnumValueId,
        external_id: impl Into<String>,
        field_id: FieldId,
        field_code: Option<&str>,
    ) -> Self {
        Self {
            id,
            external_id: external_id.into(),
            field_id,
            field_code: field_code.map(str::to_owned),
        }
    }
}

// ============================================================================
// INVALIDATION TAGS
// ============================================================================

/// Sentinel tag emitted when a new catalog may exist; invalidates every
/// catalog shard, since a previous miss could now be a hit.
pub const CATALOG_NEW_TAG: &str = "catalog_id_new";

/// Sentinel tag emitted when a new field may exist; invalidates field shards.
pub const FIELD_NEW_TAG: &str = "catalog_field_new";

/// Tag invalidating shards that contain data for one catalog.
///
/// Writers are expected to emit this tag when the catalog is updated or
/// deleted, and [`CATALOG_NEW_TAG`] when one is created.
pub fn catalog_tag(id: CatalogId) -> String {
    format!("catalog_id_{id}")
}

// =============================================================================
// TESTS
// =============================================================================
