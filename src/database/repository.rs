use async_trait::async_trait;

use crate::database::manager::DatabaseError;
use crate::types::Id;

/// A persisted record type. `id` and `version` are owned by the store.
pub trait Entity: Clone + Send + Sync + 'static {
    const TABLE: &'static str;

    fn id(&self) -> Id;
    fn assign_id(&mut self, id: Id);
    fn version(&self) -> u32;
    fn set_version(&mut self, version: u32);
}

/// Implements [`Entity`] for a struct with `id: Id` and `version: u32` fields
#[macro_export]
macro_rules! impl_entity {
    ($ty:ty, $table:literal) => {
        impl $crate::database::repository::Entity for $ty {
            const TABLE: &'static str = $table;

            fn id(&self) -> $crate::types::Id {
                self.id
            }

            fn assign_id(&mut self, id: $crate::types::Id) {
                self.id = id;
            }

            fn version(&self) -> u32 {
                self.version
            }

            fn set_version(&mut self, version: u32) {
                self.version = version;
            }
        }
    };
}

pub type Predicate<'a, T> = &'a (dyn Fn(&T) -> bool + Send + Sync);

/// Checked atomically against the other rows of the table before a guarded
/// write is applied. Receives the candidate row and every other row.
pub type Guard<'a, T> = &'a (dyn Fn(&T, &[&T]) -> Result<(), DatabaseError> + Send + Sync);

/// Persistence seam for one table
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    async fn insert(&self, record: T) -> Result<T, DatabaseError>;

    /// Insert only if `guard` accepts the candidate against the current rows
    async fn insert_guarded(&self, record: T, guard: Guard<'_, T>) -> Result<T, DatabaseError>;

    async fn get(&self, id: Id) -> Result<Option<T>, DatabaseError>;

    /// Matching rows ordered by id
    async fn find(&self, predicate: Predicate<'_, T>) -> Result<Vec<T>, DatabaseError>;

    async fn count(&self, predicate: Predicate<'_, T>) -> Result<usize, DatabaseError>;

    /// Replace a row. With `expected_version` set, a stale version is a
    /// conflict; without it the last write wins.
    async fn update(&self, record: T, expected_version: Option<u32>) -> Result<T, DatabaseError>;

    async fn update_guarded(
        &self,
        record: T,
        expected_version: Option<u32>,
        guard: Guard<'_, T>,
    ) -> Result<T, DatabaseError>;

    async fn delete(&self, id: Id) -> Result<T, DatabaseError>;

    async fn get_404(&self, id: Id) -> Result<T, DatabaseError> {
        self.get(id).await?.ok_or(DatabaseError::NotFound {
            table: T::TABLE,
            id,
        })
    }

    async fn all(&self) -> Result<Vec<T>, DatabaseError> {
        self.find(&|_: &T| true).await
    }
}
