// asp_migrator/src/lib.rs
// Public API for the asp_migrator crate.

pub mod atlas;
pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod kafka;
pub mod platform;
pub mod processor;
pub mod runner;
pub mod topic;
pub mod translate;

pub const DEFAULT_TOPIC_PARTITIONS: i32 = 3;
pub const DEFAULT_REPLICATION_FACTOR: i32 = 3;
pub const DEFAULT_CLEANUP_POLICY: &str = "delete";
pub const KAFKA_BOOTSTRAP_PORT: u16 = 9092;
