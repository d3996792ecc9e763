//! Realtime delivery: a process-wide dispatcher plus the WebSocket loop that
//! feeds each connected client.

pub mod connection;
pub mod dispatcher;

pub use dispatcher::Dispatcher;
