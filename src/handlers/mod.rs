// handlers/mod.rs - 3-Tier Handler Architecture
//
// Public (no auth) → Protected (baseline permission) → Elevated (admin permission)

pub mod elevated;
pub mod protected;
pub mod public;
