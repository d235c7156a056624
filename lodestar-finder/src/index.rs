//! Shard indexes built from bulk loads.
//!
//! An index is built atomically from one full pass over the backing rows
//! and never mutated afterwards; invalidation replaces it wholesale. The
//! builders also emit the invalidation tag set the populated shard must be
//! stored under.

use std::collections::HashMap;

use lodestar_core::{
    catalog_tag, CatalogId, CatalogRow, EnumValueId, EnumValueRow, FieldId, FieldRow, TagSet,
    CATALOG_NEW_TAG, FIELD_NEW_TAG,
};
use serde::{Deserialize, Serialize};

/// Index answering catalog-level lookups (id, type, code).
///
/// Rows without a code appear in `type_by_id` only: they can be resolved
/// by id but never by type + code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogIndex {
    /// type -> code -> catalog id
    id_by_type_code: HashMap<String, HashMap<String, CatalogId>>,
    /// catalog id -> type
    type_by_id: HashMap<CatalogId, String>,
    /// catalog id -> code
    code_by_id: HashMap<CatalogId, String>,
}

impl CatalogIndex {
    /// Build the index and its tag set from one pass over the bulk rows.
    ///
    /// Ids are store-assigned and strictly positive; rows violating that
    /// are dropped rather than poisoning the id maps. Every catalog
    /// encountered registers its tag, so updating any of them (coded or
    /// not) expires this shard; the sentinel covers catalogs created
    /// after the populate.
    pub fn from_rows<I>(rows: I) -> (Self, TagSet)
    where
        I: IntoIterator<Item = CatalogRow>,
    {
        let mut index = Self::default();
        let mut tags = TagSet::new();

        for row in rows {
            if row.id <= 0 {
                continue;
            }
            if let Some(code) = row.code.filter(|c| !c.is_empty()) {
                index
                    .id_by_type_code
                    .entry(row.catalog_type.clone())
                    .or_default()
                    .insert(code.clone(), row.id);
                index.code_by_id.insert(row.id, code);
            }
            index.type_by_id.insert(row.id, row.catalog_type);
            tags.insert(catalog_tag(row.id));
        }
        tags.insert(CATALOG_NEW_TAG.to_string());

        (index, tags)
    }

    /// Catalog id for a type + code pair.
    pub fn id_for(&self, catalog_type: &str, code: &str) -> Option<CatalogId> {
        self.id_by_type_code.get(catalog_type)?.get(code).copied()
    }

    /// Catalog type for an id.
    pub fn type_for(&self, id: CatalogId) -> Option<&str> {
        self.type_by_id.get(&id).map(String::as_str)
    }

    /// Catalog code for an id.
    pub fn code_for(&self, id: CatalogId) -> Option<&str> {
        self.code_by_id.get(&id).map(String::as_str)
    }
}

/// Index answering field-level lookups (field id, field enum id).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIndex {
    /// catalog id -> field code -> field id
    id_by_catalog_code: HashMap<CatalogId, HashMap<String, FieldId>>,
    /// field id -> external id -> enum value id
    enum_by_field_external: HashMap<FieldId, HashMap<String, EnumValueId>>,
}

impl FieldIndex {
    /// Build the index and its tag set from one pass over each bulk query.
    ///
    /// Fields without a code cannot be looked up and are skipped, as are
    /// enum values whose owning field has no code. Tags cover every owning
    /// catalog plus the new-field sentinel.
    pub fn from_rows<F, E>(fields: F, enum_values: E) -> (Self, TagSet)
    where
        F: IntoIterator<Item = FieldRow>,
        E: IntoIterator<Item = EnumValueRow>,
    {
        let mut index = Self::default();
        let mut tags = TagSet::new();

        for field in fields {
            if field.id <= 0 || field.code.is_empty() {
                continue;
            }
            index
                .id_by_catalog_code
                .entry(field.catalog_id)
                .or_default()
                .insert(field.code, field.id);
            tags.insert(catalog_tag(field.catalog_id));
        }

        for value in enum_values {
            let has_field_code = value
                .field_code
                .as_deref()
                .is_some_and(|code| !code.is_empty());
            if value.id <= 0 || !has_field_code {
                continue;
            }
            index
                .enum_by_field_external
                .entry(value.field_id)
                .or_default()
                .insert(value.external_id, value.id);
        }

        tags.insert(FIELD_NEW_TAG.to_string());

        (index, tags)
    }

    /// Field id for a catalog id + field code pair.
    pub fn field_for(&self, catalog_id: CatalogId, field_code: &str) -> Option<FieldId> {
        self.id_by_catalog_code
            .get(&catalog_id)?
            .get(field_code)
            .copied()
    }

    /// Enum value id for a field id + external id pair.
    pub fn enum_for(&self, field_id: FieldId, external_id: &str) -> Option<EnumValueId> {
        self.enum_by_field_external
            .get(&field_id)?
            .get(external_id)
            .copied()
    }
}
