pub mod client;
pub mod config;
pub mod conversation;
pub mod decoder;
pub mod driver;
pub mod errors;
pub mod models;
