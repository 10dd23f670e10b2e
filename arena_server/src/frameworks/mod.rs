// Framework bootstrap: runtime init, configuration, and the HTTP server.

pub mod config;
pub mod server;
