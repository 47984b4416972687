pub mod app;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod error;
pub mod matcher;
pub mod memory;
pub mod output;
pub mod search;
