pub mod config;
pub mod error;
pub mod fetcher;
pub mod mapper;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod stats;
