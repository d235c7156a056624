//! Get-or-populate orchestration over the cache store and backing source.
//!
//! The coordinator is the reusable engine: it routes a lookup to its
//! shard, serves warm shards straight from the cache store, and populates
//! cold shards from the backing source exactly once per invalidation
//! epoch, no matter how many callers miss concurrently.

use std::future::Future;
use std::sync::Arc;

use lodestar_core::{
    catalog_tag, CatalogId, FinderError, FinderResult, TagSet, CATALOG_NEW_TAG, FIELD_NEW_TAG,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::filter;
use crate::flight::PopulationLocks;
use crate::index::{CatalogIndex, FieldIndex};
use crate::lookup::{LookupRequest, LookupValue, Shard};
use crate::source::CatalogSource;
use crate::store::CacheStore;

/// Configuration for one finder family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinderConfig {
    /// Cache directory namespacing this family's shards.
    pub directory: String,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            directory: "lodestar/catalogs".to_string(),
        }
    }
}

impl FinderConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cache directory.
    pub fn with_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = directory.into();
        self
    }
}

/// Cache coordinator for one finder family.
///
/// Shared behind an `Arc` by every finder of the family; the population
/// locks live here, so sibling finders share the at-most-one-load
/// guarantee.
///
/// # Type Parameters
///
/// - `C`: The cache store holding populated shards
/// - `S`: The backing source performing bulk reads
#[derive(Debug)]
pub struct CacheCoordinator<C, S>
where
    C: CacheStore,
    S: CatalogSource,
{
    store: Arc<C>,
    source: Arc<S>,
    config: FinderConfig,
    population: PopulationLocks,
}

impl<C, S> CacheCoordinator<C, S>
where
    C: CacheStore,
    S: CatalogSource,
{
    /// Create a new coordinator.
    pub fn new(store: Arc<C>, source: Arc<S>, config: FinderConfig) -> Self {
        Self {
            store,
            source,
            config,
            population: PopulationLocks::new(),
        }
    }

    /// Create a new coordinator with default configuration.
    pub fn with_defaults(store: Arc<C>, source: Arc<S>) -> Self {
        Self::new(store, source, FinderConfig::default())
    }

    /// Start building a coordinator; fails with `DependencyMissing` when a
    /// collaborator is never supplied.
    pub fn builder() -> CoordinatorBuilder<C, S> {
        CoordinatorBuilder::new()
    }

    /// Get the configuration.
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Get a reference to the cache store.
    pub fn store(&self) -> &C {
        &self.store
    }

    /// Get a reference to the backing source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Resolve one lookup to its scalar.
    ///
    /// Serves from the warm shard when possible, populating it first when
    /// cold. An absent key path in a warm shard is `NotFound`; zero or
    /// empty is never a valid id or code.
    pub async fn resolve(&self, request: &LookupRequest) -> FinderResult<LookupValue> {
        let value = match request {
            LookupRequest::Id { catalog_type, code } => self
                .catalog_index()
                .await?
                .id_for(catalog_type, code)
                .map(LookupValue::Id),
            LookupRequest::Type { id } => self
                .catalog_index()
                .await?
                .type_for(*id)
                .map(|t| LookupValue::Text(t.to_owned())),
            LookupRequest::Code { id } => self
                .catalog_index()
                .await?
                .code_for(*id)
                .map(|c| LookupValue::Text(c.to_owned())),
            LookupRequest::FieldId { id, field_code } => self
                .field_index()
                .await?
                .field_for(*id, field_code)
                .map(LookupValue::Id),
            LookupRequest::FieldEnumId {
                id,
                field_code,
                external_id,
            } => {
                let index = self.field_index().await?;
                index
                    .field_for(*id, field_code)
                    .and_then(|field_id| index.enum_for(field_id, external_id))
                    .map(LookupValue::Id)
            }
        };

        value.ok_or_else(|| request.not_found())
    }

    /// Expire every shard containing the given catalog.
    pub async fn invalidate_catalog(&self, id: CatalogId) -> FinderResult<u64> {
        let id = filter::ensure_positive("id", id)?;
        let tags: TagSet = [catalog_tag(id)].into_iter().collect();
        self.invalidate(&tags).await
    }

    /// Expire every catalog shard; call after creating a catalog, since a
    /// previous miss could now be a hit.
    pub async fn notify_catalog_created(&self) -> FinderResult<u64> {
        let tags: TagSet = [CATALOG_NEW_TAG.to_string()].into_iter().collect();
        self.invalidate(&tags).await
    }

    /// Expire every field shard; call after creating a field.
    pub async fn notify_field_created(&self) -> FinderResult<u64> {
        let tags: TagSet = [FIELD_NEW_TAG.to_string()].into_iter().collect();
        self.invalidate(&tags).await
    }

    async fn invalidate(&self, tags: &TagSet) -> FinderResult<u64> {
        let evicted = self.store.invalidate(tags).await?;
        if evicted > 0 {
            tracing::debug!(evicted, "expired cached shards");
        }
        Ok(evicted)
    }

    async fn catalog_index(&self) -> FinderResult<CatalogIndex> {
        self.shard_index(Shard::Catalogs, || async {
            let rows = self.source.catalogs().await?;
            tracing::debug!(rows = rows.len(), "loaded catalog rows");
            Ok(CatalogIndex::from_rows(rows))
        })
        .await
    }

    async fn field_index(&self) -> FinderResult<FieldIndex> {
        self.shard_index(Shard::Fields, || async {
            let fields = self.source.fields().await?;
            let enum_values = self.source.enum_values().await?;
            tracing::debug!(
                fields = fields.len(),
                enum_values = enum_values.len(),
                "loaded field rows"
            );
            Ok(FieldIndex::from_rows(fields, enum_values))
        })
        .await
    }

    /// Get a shard's index, populating it under the shard's lock when
    /// cold. A failed populate stores nothing; the next caller retries.
    async fn shard_index<T, F, Fut>(&self, shard: Shard, populate: F) -> FinderResult<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = FinderResult<(T, TagSet)>>,
    {
        let directory = &self.config.directory;

        if let Some(index) = self.store.get(directory, shard.key()).await? {
            tracing::trace!(shard = shard.key(), "cache hit");
            return Ok(index);
        }

        let _guard = self.population.acquire(shard.key()).await;

        // Another task may have finished populating while we waited.
        if let Some(index) = self.store.get(directory, shard.key()).await? {
            tracing::trace!(shard = shard.key(), "cache hit after wait");
            return Ok(index);
        }

        tracing::debug!(shard = shard.key(), "cache miss, populating");
        let (index, tags) = populate().await?;
        self.store
            .put(directory, shard.key(), &index, &tags)
            .await?;

        Ok(index)
    }
}

/// Builder wiring a coordinator's collaborators.
pub struct CoordinatorBuilder<C, S>
where
    C: CacheStore,
    S: CatalogSource,
{
    store: Option<Arc<C>>,
    source: Option<Arc<S>>,
    config: FinderConfig,
}

impl<C, S> CoordinatorBuilder<C, S>
where
    C: CacheStore,
    S: CatalogSource,
{
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            store: None,
            source: None,
            config: FinderConfig::default(),
        }
    }

    /// Set the cache store.
    pub fn store(mut self, store: Arc<C>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the backing source.
    pub fn source(mut self, source: Arc<S>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the configuration.
    pub fn config(mut self, config: FinderConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the coordinator, failing when a collaborator is missing.
    pub fn build(self) -> FinderResult<CacheCoordinator<C, S>> {
        let store = self.store.ok_or(FinderError::DependencyMissing {
            dependency: "cache store",
        })?;
        let source = self.source.ok_or(FinderError::DependencyMissing {
            dependency: "catalog source",
        })?;
        Ok(CacheCoordinator::new(store, source, self.config))
    }
}

impl<C, S> Default for CoordinatorBuilder<C, S>
where
    C: CacheStore,
    S: CatalogSource,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCacheStore;
    use crate::source::{SourceResult, StaticCatalogSource};
    use async_trait::async_trait;
    use lodestar_core::{CatalogRow, EnumValueRow, FieldRow, LookupKind, SourceError};
    use std::sync::atomic::{AtomicU64, Ordering};

    fn sample_source() -> StaticCatalogSource {
        StaticCatalogSource::new()
            .with_catalogs(vec![
                CatalogRow::new(5, "catalog", Some("main")),
                CatalogRow::new(6, "catalog", Some("archive")),
            ])
            .with_fields(vec![FieldRow::new(10, "COLOR", 5)])
            .with_enum_values(vec![EnumValueRow::new(100, "RED", 10, Some("COLOR"))])
    }

    fn coordinator(
        source: StaticCatalogSource,
    ) -> CacheCoordinator<MemoryCacheStore, StaticCatalogSource> {
        CacheCoordinator::with_defaults(Arc::new(MemoryCacheStore::new()), Arc::new(source))
    }

    // Source that fails its first catalog read, then recovers.
    #[derive(Default)]
    struct FlakySource {
        attempts: AtomicU64,
    }

    #[async_trait]
    impl CatalogSource for FlakySource {
        async fn catalogs(&self) -> SourceResult<Vec<CatalogRow>> {
            if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(SourceError::Unavailable {
                    table: "catalogs".to_string(),
                    reason: "connection reset".to_string(),
                });
            }
            Ok(vec![CatalogRow::new(5, "catalog", Some("main"))])
        }

        async fn fields(&self) -> SourceResult<Vec<FieldRow>> {
            Ok(Vec::new())
        }

        async fn enum_values(&self) -> SourceResult<Vec<EnumValueRow>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_resolve_serves_repeat_lookups_from_one_load() {
        let coordinator = coordinator(sample_source());

        let request = LookupRequest::Id {
            catalog_type: "catalog".to_string(),
            code: "main".to_string(),
        };
        assert_eq!(
            coordinator.resolve(&request).await.expect("resolve"),
            LookupValue::Id(5)
        );
        assert_eq!(
            coordinator
                .resolve(&LookupRequest::Type { id: 6 })
                .await
                .expect("resolve"),
            LookupValue::Text("catalog".to_string())
        );
        assert_eq!(
            coordinator
                .resolve(&LookupRequest::Code { id: 6 })
                .await
                .expect("resolve"),
            LookupValue::Text("archive".to_string())
        );

        assert_eq!(coordinator.source().catalog_load_count(), 1);
    }

    #[tokio::test]
    async fn test_shards_populate_independently() {
        let coordinator = coordinator(sample_source());

        coordinator
            .resolve(&LookupRequest::Type { id: 5 })
            .await
            .expect("resolve");
        assert_eq!(coordinator.source().field_load_count(), 0);

        coordinator
            .resolve(&LookupRequest::FieldId {
                id: 5,
                field_code: "COLOR".to_string(),
            })
            .await
            .expect("resolve");
        assert_eq!(coordinator.source().catalog_load_count(), 1);
        assert_eq!(coordinator.source().field_load_count(), 1);
        assert_eq!(coordinator.source().enum_load_count(), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_terminal() {
        let coordinator = coordinator(sample_source());

        let request = LookupRequest::FieldId {
            id: 5,
            field_code: "WEIGHT".to_string(),
        };
        let err = coordinator.resolve(&request).await.expect_err("missing field");
        assert!(matches!(
            err,
            FinderError::NotFound {
                lookup: LookupKind::FieldId,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_failed_populate_is_not_cached() {
        let coordinator = CacheCoordinator::with_defaults(
            Arc::new(MemoryCacheStore::new()),
            Arc::new(FlakySource::default()),
        );
        let request = LookupRequest::Type { id: 5 };

        let err = coordinator.resolve(&request).await.expect_err("first load fails");
        assert!(matches!(err, FinderError::Source(_)));

        // The failure was not stored; the retry populates and succeeds.
        assert_eq!(
            coordinator.resolve(&request).await.expect("retry"),
            LookupValue::Text("catalog".to_string())
        );
        assert_eq!(coordinator.source().attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_catalog_reloads_once() {
        let coordinator = coordinator(sample_source());
        let request = LookupRequest::Type { id: 5 };

        coordinator.resolve(&request).await.expect("warm up");
        coordinator.resolve(&request).await.expect("cache hit");
        assert_eq!(coordinator.source().catalog_load_count(), 1);

        let evicted = coordinator.invalidate_catalog(5).await.expect("invalidate");
        assert_eq!(evicted, 1);

        coordinator.resolve(&request).await.expect("repopulate");
        coordinator.resolve(&request).await.expect("cache hit");
        assert_eq!(coordinator.source().catalog_load_count(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_rejects_nonpositive_id() {
        let coordinator = coordinator(sample_source());
        let err = coordinator.invalidate_catalog(0).await.expect_err("invalid id");
        assert!(matches!(err, FinderError::Filter(_)));
    }

    #[tokio::test]
    async fn test_builder_requires_collaborators() {
        let err = CacheCoordinator::<MemoryCacheStore, StaticCatalogSource>::builder()
            .source(Arc::new(StaticCatalogSource::new()))
            .build()
            .expect_err("missing store");
        assert!(matches!(
            err,
            FinderError::DependencyMissing {
                dependency: "cache store"
            }
        ));

        let err = CacheCoordinator::<MemoryCacheStore, StaticCatalogSource>::builder()
            .store(Arc::new(MemoryCacheStore::new()))
            .build()
            .expect_err("missing source");
        assert!(matches!(
            err,
            FinderError::DependencyMissing {
                dependency: "catalog source"
            }
        ));
    }
}
