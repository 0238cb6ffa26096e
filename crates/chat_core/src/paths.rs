use std::path::PathBuf;

/// Per-user configuration directory (`~/.docchat`).
pub fn docchat_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
        .join(".docchat")
}

/// Path of the per-user `config.json`.
pub fn config_json_path() -> PathBuf {
    docchat_dir().join("config.json")
}

/// Path of the project-local `docchat.toml`, relative to the working directory.
pub fn local_config_path() -> PathBuf {
    PathBuf::from("docchat.toml")
}
