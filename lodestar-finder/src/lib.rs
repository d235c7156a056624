//! LODESTAR Finder - Shard-Cached Identifier Resolution
//!
//! Resolves human-meaningful identifiers (a catalog type + code pair, a
//! field code within a catalog, an enum value's external key) into the
//! numeric primary keys the backing store uses, without re-running bulk
//! queries on every lookup.
//!
//! # Architecture
//!
//! - [`CacheStore`] holds populated shards and expires them by tag; the
//!   in-memory [`MemoryCacheStore`] and persistent [`LmdbCacheStore`] are
//!   provided, and embedders can plug their own.
//! - [`CatalogSource`] performs the bulk reads a populate needs.
//! - [`CacheCoordinator`] routes each lookup to its shard, serves warm
//!   shards from the store, and populates cold shards exactly once per
//!   invalidation epoch, even under concurrent misses.
//! - [`CatalogFinder`] binds the pieces for one catalog and exposes the
//!   accessor surface.
//!
//! # Example
//!
//! ```ignore
//! let store = Arc::new(MemoryCacheStore::new());
//! let source = Arc::new(MyOrmSource::new(pool));
//! let coordinator = Arc::new(CacheCoordinator::with_defaults(store, source));
//!
//! let finder = CatalogFinder::new(
//!     Arc::clone(&coordinator),
//!     CatalogFilter::by_type_code("catalog", "main"),
//! )
//! .await?;
//!
//! let id = finder.id();
//! let color = finder.field_enum_id("COLOR", "RED").await?;
//! ```
//!
//! # Invalidation
//!
//! Populating a shard registers one tag per catalog it contains plus a
//! creation sentinel. Writers call
//! [`CacheCoordinator::invalidate_catalog`] after updating or deleting a
//! catalog and [`CacheCoordinator::notify_catalog_created`] /
//! [`CacheCoordinator::notify_field_created`] after creating one; the next
//! lookup touching an expired shard runs a fresh bulk load.

pub mod coordinator;
pub mod filter;
pub mod finder;
pub mod index;
pub mod lmdb;
pub mod lookup;
pub mod memory;
pub mod source;
pub mod store;

mod flight;

pub use coordinator::{CacheCoordinator, CoordinatorBuilder, FinderConfig};
pub use filter::CatalogFilter;
pub use finder::CatalogFinder;
pub use index::{CatalogIndex, FieldIndex};
pub use lmdb::{LmdbCacheStore, LmdbStoreError};
pub use lookup::{LookupRequest, LookupValue, Shard};
pub use memory::MemoryCacheStore;
pub use source::{CatalogSource, SourceResult, StaticCatalogSource};
pub use store::{CacheStats, CacheStore, StoredEntry};
