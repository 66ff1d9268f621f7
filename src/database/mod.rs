pub mod manager;
pub mod memory;
pub mod models;
pub mod repository;
pub mod seed;

pub use manager::{Database, DatabaseError};
pub use repository::{Entity, Repository};
pub use seed::{seed_demo, DemoIds};
