//! Catalog finder: the public resolution surface.
//!
//! A finder is constructed per logical catalog from a filter. Identity is
//! resolved eagerly: when the filter carries no direct id, construction
//! itself goes through the coordinator (populating the catalog shard when
//! cold) and fails outright when the catalog does not exist; there is no
//! partially constructed finder.

use std::sync::Arc;

use lodestar_core::{CatalogId, EnumValueId, FieldId, FilterError, FinderResult};

use crate::coordinator::CacheCoordinator;
use crate::filter::{sanitize, CatalogFilter};
use crate::lookup::{LookupRequest, LookupValue};
use crate::source::CatalogSource;
use crate::store::CacheStore;

/// Finder for one catalog and its fields.
///
/// Accessors other than [`id`](Self::id) go through the coordinator on
/// every call; warm shards make that a pure in-memory lookup.
#[derive(Debug)]
pub struct CatalogFinder<C, S>
where
    C: CacheStore,
    S: CatalogSource,
{
    coordinator: Arc<CacheCoordinator<C, S>>,
    id: CatalogId,
}

impl<C, S> CatalogFinder<C, S>
where
    C: CacheStore,
    S: CatalogSource,
{
    /// Create a finder for the catalog the filter identifies.
    ///
    /// The filter is normalized first; a direct id is adopted without any
    /// cache read, while a type + code pair resolves through the cache.
    /// Missing criteria fail with `MissingCriterion` naming the absent
    /// one, an unknown type + code pair with `NotFound`.
    pub async fn new(
        coordinator: Arc<CacheCoordinator<C, S>>,
        filter: CatalogFilter,
    ) -> FinderResult<Self> {
        let filter = filter.normalized()?;

        let id = match filter.id {
            Some(id) => id,
            None => {
                let catalog_type = filter
                    .catalog_type
                    .ok_or(FilterError::MissingCriterion { criterion: "type" })?;
                let code = filter
                    .code
                    .ok_or(FilterError::MissingCriterion { criterion: "code" })?;
                let request = LookupRequest::Id { catalog_type, code };
                match coordinator.resolve(&request).await? {
                    LookupValue::Id(id) => id,
                    LookupValue::Text(_) => return Err(request.not_found()),
                }
            }
        };

        Ok(Self { coordinator, id })
    }

    /// The catalog's numeric id.
    ///
    /// Identity is known from construction on, so this never touches the
    /// cache.
    pub fn id(&self) -> CatalogId {
        self.id
    }

    /// The catalog's type.
    pub async fn catalog_type(&self) -> FinderResult<String> {
        self.resolve_text(LookupRequest::Type { id: self.id }).await
    }

    /// The catalog's code.
    pub async fn code(&self) -> FinderResult<String> {
        self.resolve_text(LookupRequest::Code { id: self.id }).await
    }

    /// Id of a field of this catalog, by field code.
    pub async fn field_id(&self, field_code: &str) -> FinderResult<FieldId> {
        let field_code = sanitize("field_code", field_code)?;
        self.resolve_id(LookupRequest::FieldId {
            id: self.id,
            field_code,
        })
        .await
    }

    /// Id of an enumerated field value, by field code and external id.
    pub async fn field_enum_id(
        &self,
        field_code: &str,
        external_id: &str,
    ) -> FinderResult<EnumValueId> {
        let field_code = sanitize("field_code", field_code)?;
        let external_id = sanitize("external_id", external_id)?;
        self.resolve_id(LookupRequest::FieldEnumId {
            id: self.id,
            field_code,
            external_id,
        })
        .await
    }

    async fn resolve_id(&self, request: LookupRequest) -> FinderResult<i64> {
        match self.coordinator.resolve(&request).await? {
            LookupValue::Id(id) => Ok(id),
            LookupValue::Text(_) => Err(request.not_found()),
        }
    }

    async fn resolve_text(&self, request: LookupRequest) -> FinderResult<String> {
        match self.coordinator.resolve(&request).await? {
            LookupValue::Text(text) => Ok(text),
            LookupValue::Id(_) => Err(request.not_found()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCacheStore;
    use crate::source::StaticCatalogSource;
    use lodestar_core::{CatalogRow, FinderError, LookupKind};

    fn coordinator(
        source: StaticCatalogSource,
    ) -> Arc<CacheCoordinator<MemoryCacheStore, StaticCatalogSource>> {
        Arc::new(CacheCoordinator::with_defaults(
            Arc::new(MemoryCacheStore::new()),
            Arc::new(source),
        ))
    }

    fn single_catalog() -> StaticCatalogSource {
        StaticCatalogSource::new().with_catalogs(vec![CatalogRow::new(5, "catalog", Some("main"))])
    }

    #[tokio::test]
    async fn test_type_code_filter_resolves_id() {
        let coordinator = coordinator(single_catalog());
        let finder = CatalogFinder::new(coordinator, CatalogFilter::by_type_code("catalog", "main"))
            .await
            .expect("construct");
        assert_eq!(finder.id(), 5);
    }

    #[tokio::test]
    async fn test_id_filter_defers_load_until_first_accessor() {
        let coordinator = coordinator(single_catalog());
        let finder = CatalogFinder::new(Arc::clone(&coordinator), CatalogFilter::by_id(5))
            .await
            .expect("construct");
        assert_eq!(coordinator.source().catalog_load_count(), 0);

        assert_eq!(finder.catalog_type().await.expect("type"), "catalog");
        assert_eq!(finder.code().await.expect("code"), "main");
        assert_eq!(coordinator.source().catalog_load_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_criteria_named() {
        let coordinator = coordinator(single_catalog());

        let filter = CatalogFilter {
            id: None,
            catalog_type: None,
            code: Some("main".to_string()),
        };
        let err = CatalogFinder::new(Arc::clone(&coordinator), filter)
            .await
            .expect_err("no type");
        assert!(matches!(
            err,
            FinderError::Filter(FilterError::MissingCriterion { criterion: "type" })
        ));

        let filter = CatalogFilter {
            id: None,
            catalog_type: Some("catalog".to_string()),
            code: None,
        };
        let err = CatalogFinder::new(coordinator, filter)
            .await
            .expect_err("no code");
        assert!(matches!(
            err,
            FinderError::Filter(FilterError::MissingCriterion { criterion: "code" })
        ));
    }

    #[tokio::test]
    async fn test_unknown_catalog_fails_construction() {
        let coordinator = coordinator(single_catalog());
        let err = CatalogFinder::new(coordinator, CatalogFilter::by_type_code("catalog", "ghost"))
            .await
            .expect_err("ghost catalog");
        assert!(matches!(
            err,
            FinderError::NotFound {
                lookup: LookupKind::Id,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_accessor_arguments_validated_before_store_access() {
        let coordinator = coordinator(single_catalog());
        let finder = CatalogFinder::new(Arc::clone(&coordinator), CatalogFilter::by_id(5))
            .await
            .expect("construct");

        let err = finder.field_id("   ").await.expect_err("blank code");
        assert!(matches!(err, FinderError::Filter(_)));
        let err = finder
            .field_enum_id("COLOR", "")
            .await
            .expect_err("blank external id");
        assert!(matches!(err, FinderError::Filter(_)));

        // Validation failed before any field shard activity.
        assert_eq!(coordinator.source().field_load_count(), 0);
    }
}
