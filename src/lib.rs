pub mod app;
pub mod catalog;
pub mod domain;
pub mod error;
pub mod manifest;
pub mod output;
pub mod plan;
pub mod run_dir;
pub mod source;
pub mod transfer;
