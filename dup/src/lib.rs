pub mod commands;
pub mod config;
pub mod error;
pub mod oauth_flow;
pub mod output;
pub mod session;
pub mod storage;
pub mod token_provider;
pub mod transfer;
pub mod vfs;

pub use error::VfsError;
