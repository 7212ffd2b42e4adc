pub mod client;
pub mod filters;

pub use client::{RemoteClient, RemoteError};
pub use filters::Filters;
