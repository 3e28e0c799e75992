pub mod clock;
pub mod config;
pub mod credentials;
pub mod duration;
pub mod format;
pub mod models;
pub mod provider;
pub mod reconcile;
pub mod report;
pub mod storage;
