// handlers/protected/mod.rs - endpoints behind the JWT middleware
//
// Each handler names its permission with an `Authorized<perm::...>` extractor;
// ownership checks happen inside the handler once the record is loaded.

pub mod activities;
pub mod auth;
pub mod classes;
pub mod enrollment;
pub mod finance;
pub mod schedules;
pub mod students;
pub mod system;
pub mod users;

mod utils;
