pub mod config;
pub mod reader;

pub use config::PostgresConfig;
pub use reader::PostgresReader;
