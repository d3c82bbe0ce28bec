pub mod canonical;
pub mod categorize;
pub mod classify;
pub mod config;
pub mod context;
pub mod enrich;
pub mod error;
pub mod fetch;
pub mod links;
pub mod orchestrator;
pub mod robots;
pub mod scheduler;
pub mod storage;
pub mod worker;
