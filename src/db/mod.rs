// src/db/mod.rs
//
// Database module
//
// Provides:
// - Connection pooling (one pool per store)
// - Schema migrations
// - Database utilities

pub mod connection;
pub mod migrations;

pub use connection::{
    create_connection_pool, create_memory_pool, get_connection, ConnectionPool, PooledConn,
};

pub use migrations::{
    get_database_stats, initialize_broker_store, initialize_database,
    initialize_recommendation_store,
    verify_database_integrity, DatabaseStats,
};
