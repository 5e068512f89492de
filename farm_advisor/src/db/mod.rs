//! Database utilities for connections and schema migrations.
//!
//! - [`connection::connect_sqlite`] opens a connection with WAL,
//!   `foreign_keys=ON` and a 5000ms `busy_timeout`.
//! - [`migrate::run_sqlite`] applies the embedded Diesel migrations.
//!
//! ```no_run
//! use farm_advisor::db::{connection, migrate};
//!
//! let db_path = std::env::temp_dir().join("farm_advisor_example.db");
//! migrate::run_sqlite(db_path.to_str().unwrap()).expect("migrations");
//! let _conn = connection::connect_sqlite(db_path.to_str().unwrap()).expect("connect");
//! ```

pub mod connection;
pub mod migrate;
