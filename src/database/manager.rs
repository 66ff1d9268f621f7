use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::database::memory::MemoryTable;
use crate::database::models::{
    Activity, ClassRoom, EnrollmentApplication, EnrollmentPlan, Feedback, Payment, Registration,
    ScheduleEntry, Student, SystemSettings, User,
};
use crate::database::repository::Repository;
use crate::rules::RuleViolation;
use crate::types::Id;

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database is closed")]
    Closed,

    #[error("{table} record {id} not found")]
    NotFound { table: &'static str, id: Id },

    #[error("{table} record {id} is at version {actual}, expected {expected}")]
    VersionConflict {
        table: &'static str,
        id: Id,
        expected: u32,
        actual: u32,
    },

    #[error("Unique constraint on {table}: {message}")]
    Unique { table: &'static str, message: String },

    /// A guard refused the write
    #[error(transparent)]
    Rejected(#[from] RuleViolation),

    #[error("Aborted: {0}")]
    Aborted(String),
}

/// Handle to every table of the store. Starts closed; call [`Database::open`]
/// before serving traffic.
pub struct Database {
    open: Arc<AtomicBool>,
    pub users: Arc<dyn Repository<User>>,
    pub students: Arc<dyn Repository<Student>>,
    pub classes: Arc<dyn Repository<ClassRoom>>,
    pub activities: Arc<dyn Repository<Activity>>,
    pub registrations: Arc<dyn Repository<Registration>>,
    pub feedback: Arc<dyn Repository<Feedback>>,
    pub schedules: Arc<dyn Repository<ScheduleEntry>>,
    pub plans: Arc<dyn Repository<EnrollmentPlan>>,
    pub applications: Arc<dyn Repository<EnrollmentApplication>>,
    pub payments: Arc<dyn Repository<Payment>>,
    pub settings: Arc<dyn Repository<SystemSettings>>,
}

impl Database {
    pub fn in_memory() -> Self {
        let open = Arc::new(AtomicBool::new(false));

        Self {
            users: Arc::new(MemoryTable::new(open.clone())),
            students: Arc::new(MemoryTable::new(open.clone())),
            classes: Arc::new(MemoryTable::new(open.clone())),
            activities: Arc::new(MemoryTable::new(open.clone())),
            registrations: Arc::new(MemoryTable::new(open.clone())),
            feedback: Arc::new(MemoryTable::new(open.clone())),
            schedules: Arc::new(MemoryTable::new(open.clone())),
            plans: Arc::new(MemoryTable::new(open.clone())),
            applications: Arc::new(MemoryTable::new(open.clone())),
            payments: Arc::new(MemoryTable::new(open.clone())),
            settings: Arc::new(MemoryTable::new(open.clone())),
            open,
        }
    }

    pub async fn open(&self) -> Result<(), DatabaseError> {
        self.open.store(true, Ordering::Release);
        info!("Opened in-memory database");
        Ok(())
    }

    /// Subsequent operations fail with [`DatabaseError::Closed`]
    pub async fn close(&self) {
        self.open.store(false, Ordering::Release);
        info!("Closed in-memory database");
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        self.settings.count(&|_: &SystemSettings| true).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lifecycle_gates_access() {
        let db = Database::in_memory();
        assert!(!db.is_open());
        assert!(matches!(db.health_check().await, Err(DatabaseError::Closed)));

        db.open().await.unwrap();
        assert!(db.health_check().await.is_ok());

        db.close().await;
        assert!(matches!(db.users.get(1).await, Err(DatabaseError::Closed)));
    }
}
