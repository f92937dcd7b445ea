pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod source;
pub mod stats;
pub mod upload;
