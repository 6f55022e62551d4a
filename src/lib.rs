pub mod aggregate;
pub mod config;
pub mod engine;
pub mod output;
pub mod report;
pub mod server;
pub mod snapshot;
pub mod source;
pub mod sync;
pub mod types;
