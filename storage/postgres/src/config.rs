use serde::Deserialize;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

/// PostgreSQL connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_max_conns")]
    pub max_conns: u32,
}

fn default_port() -> u16 {
    5432
}
fn default_user() -> String {
    "postgres".into()
}
fn default_database() -> String {
    "messages".into()
}
fn default_max_conns() -> u32 {
    10
}

impl PostgresConfig {
    /// Build a connection pool, validating the server is reachable.
    pub async fn connect(&self) -> Result<PgPool, sqlx::Error> {
        let opts = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database);
        PgPoolOptions::new()
            .max_connections(self.max_conns)
            .connect_with(opts)
            .await
    }
}
