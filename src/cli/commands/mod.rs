pub mod endpoints;
pub mod explain;
pub mod resolve;
pub mod server;
