use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::database::manager::DatabaseError;
use crate::database::repository::{Entity, Guard, Predicate, Repository};
use crate::types::Id;

/// In-process table. Every write takes the table's write lock, so a guard
/// and the write it protects are one atomic step.
pub struct MemoryTable<T> {
    rows: RwLock<BTreeMap<Id, T>>,
    next_id: AtomicI64,
    open: Arc<AtomicBool>,
}

impl<T: Entity> MemoryTable<T> {
    pub fn new(open: Arc<AtomicBool>) -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
            open,
        }
    }

    fn ensure_open(&self) -> Result<(), DatabaseError> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(DatabaseError::Closed)
        }
    }

    fn prepare_insert(&self, mut record: T) -> T {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        record.assign_id(id);
        record.set_version(1);
        record
    }

    fn prepare_update(
        rows: &BTreeMap<Id, T>,
        mut record: T,
        expected_version: Option<u32>,
    ) -> Result<T, DatabaseError> {
        let id = record.id();
        let current = rows.get(&id).ok_or(DatabaseError::NotFound { table: T::TABLE, id })?;

        if let Some(expected) = expected_version {
            if expected != current.version() {
                return Err(DatabaseError::VersionConflict {
                    table: T::TABLE,
                    id,
                    expected,
                    actual: current.version(),
                });
            }
        }

        record.set_version(current.version() + 1);
        Ok(record)
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for MemoryTable<T> {
    async fn insert(&self, record: T) -> Result<T, DatabaseError> {
        self.ensure_open()?;
        let record = self.prepare_insert(record);
        self.rows.write().await.insert(record.id(), record.clone());
        tracing::trace!("Inserted {} {}", T::TABLE, record.id());
        Ok(record)
    }

    async fn insert_guarded(&self, record: T, guard: Guard<'_, T>) -> Result<T, DatabaseError> {
        self.ensure_open()?;
        let mut rows = self.rows.write().await;

        let others: Vec<&T> = rows.values().collect();
        guard(&record, &others)?;

        let record = self.prepare_insert(record);
        rows.insert(record.id(), record.clone());
        tracing::trace!("Inserted {} {} (guarded)", T::TABLE, record.id());
        Ok(record)
    }

    async fn get(&self, id: Id) -> Result<Option<T>, DatabaseError> {
        self.ensure_open()?;
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn find(&self, predicate: Predicate<'_, T>) -> Result<Vec<T>, DatabaseError> {
        self.ensure_open()?;
        let rows = self.rows.read().await;
        Ok(rows.values().filter(|row| predicate(row)).cloned().collect())
    }

    async fn count(&self, predicate: Predicate<'_, T>) -> Result<usize, DatabaseError> {
        self.ensure_open()?;
        let rows = self.rows.read().await;
        Ok(rows.values().filter(|row| predicate(row)).count())
    }

    async fn update(&self, record: T, expected_version: Option<u32>) -> Result<T, DatabaseError> {
        self.ensure_open()?;
        let mut rows = self.rows.write().await;
        let record = Self::prepare_update(&rows, record, expected_version)?;
        rows.insert(record.id(), record.clone());
        Ok(record)
    }

    async fn update_guarded(
        &self,
        record: T,
        expected_version: Option<u32>,
        guard: Guard<'_, T>,
    ) -> Result<T, DatabaseError> {
        self.ensure_open()?;
        let mut rows = self.rows.write().await;
        let record = Self::prepare_update(&rows, record, expected_version)?;

        let others: Vec<&T> = rows.values().filter(|row| row.id() != record.id()).collect();
        guard(&record, &others)?;

        rows.insert(record.id(), record.clone());
        Ok(record)
    }

    async fn delete(&self, id: Id) -> Result<T, DatabaseError> {
        self.ensure_open()?;
        self.rows
            .write()
            .await
            .remove(&id)
            .ok_or(DatabaseError::NotFound { table: T::TABLE, id })
    }
}
