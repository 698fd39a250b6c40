use pollify_core::{Config, Database};

/// Open the configured database (default: `<data_dir>/pollify.db`).
pub fn open_database() -> Result<Database, Box<dyn std::error::Error>> {
    let config = Config::load();
    let path = config.database_path()?;
    Ok(Database::open(&path)?)
}
