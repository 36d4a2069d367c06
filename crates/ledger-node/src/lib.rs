//! HTTP node exposing a [`ledger_core::Ledger`] to clients and peers.

pub mod backup;
pub mod config;
mod constants;
pub mod messages;
pub mod routes;
pub mod system;
pub mod transport;

pub use config::NodeArgs;
pub use routes::{router, AppState};
pub use transport::HttpTransport;
