//! Database layer for fieldsync

mod connection;
mod migrations;

pub use connection::Database;
