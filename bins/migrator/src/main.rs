//! Database migration runner for Finly.
//!
//! Reads `DATABASE_URL` from the environment or `.env`.
//!
//! Usage:
//!   migrator up      - Apply the budget ledger schema
//!   migrator down    - Roll it back
//!   migrator status  - Show migration status

use sea_orm_migration::prelude::*;
use finly_db::migration::Migrator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // run_cli installs its own tracing subscriber
    cli::run_cli(Migrator).await;
}
