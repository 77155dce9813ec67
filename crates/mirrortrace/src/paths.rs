use std::path::PathBuf;

use directories_next::ProjectDirs;

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "mirrortrace";
const APPLICATION: &str = "mirrortrace";

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// `config.toml` inside the platform config directory, when one exists.
pub fn default_config_file() -> Option<PathBuf> {
    ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
