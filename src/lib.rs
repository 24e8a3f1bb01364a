pub mod error;
pub mod routes;
pub mod config;
pub mod identity;
pub mod security;
pub mod gate;
pub mod notifications;
pub mod server;
pub mod cli;
