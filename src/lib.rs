pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod remote;
pub mod services;

pub use errors::TrackerError;
pub use services::BetTracker;
