//! Scratch Postgres databases for the ignored storage tests.

mod error;

pub use error::{Error, Result};

use std::{env, str::FromStr};

use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use uuid::Uuid;

use quarry_config::Postgres;

pub const DSN_ENV: &str = "QUARRY_PG_DSN";

/// A database created beside the one named by `QUARRY_PG_DSN` and dropped by `drop_database`.
pub struct ScratchDatabase {
	name: String,
	dsn: String,
	admin: PgConnectOptions,
}
impl ScratchDatabase {
	/// Returns `None` when `QUARRY_PG_DSN` is unset.
	pub async fn from_env() -> Result<Option<Self>> {
		match env::var(DSN_ENV) {
			Ok(base_dsn) => Self::create(&base_dsn).await.map(Some),
			Err(_) => Ok(None),
		}
	}

	pub async fn create(base_dsn: &str) -> Result<Self> {
		let base = PgConnectOptions::from_str(base_dsn)
			.map_err(|err| Error::Message(format!("Failed to parse {DSN_ENV}: {err}.")))?;
		let admin = base.clone().database("postgres");
		let name = format!("quarry_scratch_{}", Uuid::new_v4().simple());
		let mut conn = PgConnection::connect_with(&admin).await?;

		conn.execute(format!(r#"CREATE DATABASE "{name}""#).as_str()).await?;

		let dsn = base.database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, admin })
	}

	/// Storage settings pointing at the scratch database, ready for `Db::connect`.
	pub fn postgres(&self, pool_max_conns: u32) -> Postgres {
		Postgres { dsn: self.dsn.clone(), pool_max_conns }
	}

	pub async fn drop_database(self) -> Result<()> {
		let mut conn = PgConnection::connect_with(&self.admin).await?;

		sqlx::query(
			"\
SELECT pg_terminate_backend(pid)
FROM pg_stat_activity
WHERE datname = $1 AND pid <> pg_backend_pid()",
		)
		.bind(&self.name)
		.execute(&mut conn)
		.await?;
		conn.execute(format!(r#"DROP DATABASE IF EXISTS "{}""#, self.name).as_str()).await?;

		Ok(())
	}
}
