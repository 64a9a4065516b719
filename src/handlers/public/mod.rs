// handlers/public/mod.rs - Endpoints reachable without credentials
pub mod health;

pub use health::health;
