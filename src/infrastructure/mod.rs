pub mod artifact_store;
#[path = "config/mod.rs"]
pub mod config_mod;
pub use config_mod as config;
pub mod fetch;
pub mod storage;
pub mod sweeper;
pub mod tabular;
