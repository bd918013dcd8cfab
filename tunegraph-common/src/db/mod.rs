//! Store bootstrap: connection pool and schema

pub mod init;

pub use init::{create_schema, init_database};
