pub mod backend;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod git;
pub mod http;
pub mod index;
pub mod indexer;
pub mod manifest;
pub mod pipeline;
pub mod registry;
pub mod report;
pub mod runtime;
