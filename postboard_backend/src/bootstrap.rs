use crate::config::PostboardConfig;
use crate::database::Database;
use anyhow::Result;
use std::fs;

pub struct BootstrapResources {
    pub directories_created: Vec<String>,
    pub database_initialized: bool,
    pub database: Database,
}

pub fn initialize(config: &PostboardConfig) -> Result<BootstrapResources> {
    let mut directories_created = Vec::new();
    create_dir_if_missing(&config.paths.data_dir, &mut directories_created)?;
    create_dir_if_missing(&config.paths.logs_dir, &mut directories_created)?;

    let database = Database::connect(&config.paths)?;
    let database_initialized = database.ensure_migrations()?;

    tracing::info!(
        directories_created = ?directories_created,
        database_initialized,
        db_path = %config.paths.db_path.display(),
        "postboard storage ready"
    );

    Ok(BootstrapResources {
        directories_created,
        database_initialized,
        database,
    })
}

fn create_dir_if_missing(path: &std::path::Path, created: &mut Vec<String>) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
        created.push(path.display().to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, PostboardPaths};

    #[test]
    fn initialize_creates_layout_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let config = PostboardConfig::new(
            0,
            PostboardPaths::from_base_dir(dir.path()).unwrap(),
            AuthConfig::with_secret("x".repeat(32)),
        );

        let first = initialize(&config).unwrap();
        assert!(first.database_initialized);
        assert_eq!(first.directories_created.len(), 2);
        assert!(config.paths.db_path.exists());
        drop(first);

        let second = initialize(&config).unwrap();
        assert!(!second.database_initialized);
        assert!(second.directories_created.is_empty());
    }
}
