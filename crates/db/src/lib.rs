pub mod cache;
pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod optimistic;
pub mod repositories;

pub use cache::{QueryCache, QueryKey};
pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{DemoSeedDataset, SeedResult, VerificationResult};
pub use optimistic::OptimisticMutationController;
