// handlers/mod.rs - two-tier handler layout
//
// Public (no auth) -> Protected (JWT auth, then per-handler permission markers)

pub mod protected;
pub mod public;
