pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod endpoints;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod hooks;
pub mod server;

#[cfg(test)]
pub mod testing;
