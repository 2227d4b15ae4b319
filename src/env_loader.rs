use std::path::PathBuf;

use contributors_updater::config::APP_DIR;

fn fallback_dotenv_path(config_dir: Option<PathBuf>) -> Option<PathBuf> {
    Some(config_dir?.join(APP_DIR).join(".env"))
}

/// Load `.env` from the working directory, falling back to the app config dir.
pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let Some(path) = fallback_dotenv_path(dirs::config_dir()) else {
        return;
    };
    if path.is_file() {
        let _ = dotenvy::from_path(&path);
    }
}

#[cfg(test)]
mod tests {
    use super::fallback_dotenv_path;
    use std::path::PathBuf;

    #[test]
    fn fallback_uses_app_subdir_of_config_dir() {
        let got = fallback_dotenv_path(Some(PathBuf::from("/home/alice/.config")));
        let want = Some(PathBuf::from(
            "/home/alice/.config/contributors-updater/.env",
        ));
        assert_eq!(got, want);
    }

    #[test]
    fn fallback_is_none_without_config_dir() {
        assert_eq!(fallback_dotenv_path(None), None);
    }
}
