use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Clinicore";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application data directory, ~/Clinicore/ on all platforms.
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join(APP_NAME)
}

/// Default location of the SQLite database file.
pub fn database_path() -> PathBuf {
    app_data_dir().join("database").join("clinicore.db")
}

/// Directory where rendered prescription documents are written.
pub fn exports_dir() -> PathBuf {
    app_data_dir().join("exports")
}

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "clinicore=info,rusqlite=warn"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("Clinicore"));
    }

    #[test]
    fn database_path_under_app_data() {
        let db = database_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with("database/clinicore.db"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.3.0");
    }
}
