pub mod attachment;
pub mod ids;
pub mod mirror;
pub mod normalize;
pub mod notifier;
pub mod record;
mod repository;
pub mod snapshot;
pub mod stats;
pub mod tracker;

pub use attachment::Receipt;
pub use notifier::{Notice, NoticeLevel};
pub use stats::BetStatistics;
pub use tracker::BetTracker;
