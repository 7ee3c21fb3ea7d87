use std::path::PathBuf;
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the config file path: `<exe_dir>/config.json`
pub fn get_config_path() -> PathBuf {
    get_exe_dir().join("config.json")
}

/// Returns the default screenshot root.
///
/// Prefers `<Pictures>/freecam`, falling back to `<exe_dir>/screenshots/`
/// on systems without a pictures directory.
pub fn default_screenshots_dir() -> PathBuf {
    dirs::picture_dir()
        .map(|p| p.join("freecam"))
        .unwrap_or_else(|| get_exe_dir().join("screenshots"))
}

/// Ensures the logs directory exists. Call at startup.
///
/// Screenshot directories are created per session, not here.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logs_dir_is_under_exe_dir() {
        assert!(get_logs_dir().starts_with(get_exe_dir()));
        assert!(get_config_path().ends_with("config.json"));
    }
}
