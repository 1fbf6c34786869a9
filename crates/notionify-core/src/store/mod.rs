//! Mapping store: durable `fingerprint -> record id` and `path -> cursor` associations.

mod sqlite;

use async_trait::async_trait;

use crate::error::StoreError;

pub use sqlite::LibSqlMappingStore;

/// Durable key-value store shared by mappings and cursors.
///
/// Keys are namespaced by purpose (`cloudfile-...`, `cursor-...`) so both can
/// live in one physical store. A missing key is `Ok(None)`, never an error.
#[async_trait]
pub trait MappingStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
