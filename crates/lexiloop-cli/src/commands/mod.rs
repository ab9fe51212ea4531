pub mod common;
pub mod config;
pub mod library;
pub mod session;
pub mod word;
