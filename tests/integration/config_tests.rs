use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use fsindex::config::{Config, ConfigError, ENV_PREFIX};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.workers, 16);
    assert_eq!(config.checkpoint_interval_secs, 600);
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let toml_content = r#"
checkpoint_path = "/var/lib/fsindex/index.json"
workers = 8
checkpoint_interval_secs = 120
backups = 5
follow_symlinks = true
"#;
    fs::write(&config_path, toml_content).unwrap();

    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&config_path));
    let config: Config = figment.extract().unwrap();

    assert_eq!(
        config.checkpoint_path,
        Some(PathBuf::from("/var/lib/fsindex/index.json"))
    );
    assert_eq!(config.workers, 8);
    assert_eq!(config.checkpoint_interval_secs, 120);
    assert_eq!(config.backups, 5);
    assert!(config.follow_symlinks);
    // Unset keys keep their defaults
    assert_eq!(config.chunk_size, Config::default().chunk_size);
}

#[test]
fn test_config_env_overrides_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "throughput_window = 20\nlarge_file_threshold = 1000\n").unwrap();

    std::env::set_var("FSINDEX_THROUGHPUT_WINDOW", "40");

    let figment = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .merge(Env::prefixed(ENV_PREFIX));
    let config: Config = figment.extract().unwrap();

    std::env::remove_var("FSINDEX_THROUGHPUT_WINDOW");

    assert_eq!(config.throughput_window, 40);
    assert_eq!(config.large_file_threshold, 1000);
}

#[test]
fn test_config_load_explicit_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("fsindex.toml");
    fs::write(&config_path, "backups = 9\nchunk_size = 4096\n").unwrap();

    let config = Config::load(Some(&config_path)).unwrap();
    assert_eq!(config.backups, 9);
    assert_eq!(config.chunk_size, 4096);
}

#[test]
fn test_config_missing_explicit_file() {
    let temp_dir = tempdir().unwrap();
    let err = Config::load(Some(&temp_dir.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
}

#[test]
fn test_config_invalid_values_rejected() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "workers = 0\n").unwrap();

    let err = Config::load(Some(&config_path)).unwrap_err();
    match err {
        ConfigError::Invalid { field, .. } => assert_eq!(field, "workers"),
        other => panic!("Expected Invalid, got {:?}", other),
    }
}

#[test]
fn test_config_malformed_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "workers = \"many\"\n").unwrap();

    assert!(matches!(
        Config::load(Some(&config_path)),
        Err(ConfigError::Figment(_))
    ));
}

#[test]
fn test_config_save_and_reload() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("nested").join("config.toml");

    let config = Config {
        checkpoint_path: Some(temp_dir.path().join("idx.json")),
        workers: 3,
        backups: 0,
        ..Config::default()
    };
    config.save(&config_path).unwrap();

    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&config_path));
    let loaded: Config = figment.extract().unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_config_drives_store_and_indexer() {
    let temp_dir = tempdir().unwrap();
    let config = Config {
        checkpoint_path: Some(temp_dir.path().join("idx.json")),
        workers: 6,
        checkpoint_interval_secs: 30,
        backups: 4,
        follow_symlinks: true,
        ..Config::default()
    };

    let store = config.checkpoint_store().unwrap();
    assert_eq!(store.path(), temp_dir.path().join("idx.json"));
    assert_eq!(store.backups(), 4);

    let indexer = config.indexer_config();
    assert_eq!(indexer.workers, 6);
    assert_eq!(indexer.checkpoint_interval, Duration::from_secs(30));
    assert!(indexer.walker.follow_symlinks);
}
