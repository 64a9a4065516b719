// handlers/mod.rs - Handler tiers
//
// Public (no auth) → Protected (HTTP Basic auth, row-scoped by caller)
pub mod protected;
pub mod public;
