//! `migrate`: apply pending SQLite migrations to the metadata store.

use clap::Args;
use featurewatch_store::db;
use featurewatch_store::migrations;

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Path to the SQLite database file. Created if it doesn't exist.
    #[arg(long, default_value = "./data/featurewatch.db")]
    pub sqlite_path: String,
}

pub fn execute(args: MigrateArgs) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = std::path::Path::new(&args.sqlite_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut conn = db::open(&args.sqlite_path)?;
    db::configure(&conn)?;
    migrations::apply_migrations(&mut conn)?;
    println!("migrations applied: {}", args.sqlite_path);
    Ok(())
}
