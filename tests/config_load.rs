// tests/config_load.rs
// Config resolution touches process env and CWD, so every test is serial.
use std::{env, fs};

use news_worker::config::worker::{ENV_CONFIG_PATH, WorkerConfig};
use news_worker::error::ConfigError;
use serial_test::serial;

const ENV_KEYS: &[&str] = &[
    ENV_CONFIG_PATH,
    "NEWS_API_BASE_URL",
    "POLL_INTERVAL_SECS",
    "NOTIFY_ENDPOINT",
    "DATA_DIR",
    "STATUS_ADDR",
    "WATCH_KEYWORDS",
];

/// Clears worker env vars on creation and again on drop.
struct CleanEnv;

impl CleanEnv {
    fn new() -> Self {
        for k in ENV_KEYS {
            env::remove_var(k);
        }
        CleanEnv
    }
}

impl Drop for CleanEnv {
    fn drop(&mut self) {
        for k in ENV_KEYS {
            env::remove_var(k);
        }
    }
}

#[test]
#[serial]
fn falls_back_to_defaults_without_any_file() {
    let _env = CleanEnv::new();
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    let cfg = WorkerConfig::load(None);

    env::set_current_dir(&old).unwrap();
    assert_eq!(cfg.unwrap(), WorkerConfig::default());
}

#[test]
#[serial]
fn file_then_env_then_explicit_overrides() {
    let _env = CleanEnv::new();
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("worker.toml");
    fs::write(
        &path,
        r#"
api_base_url = "http://from-file:8080"
poll_interval_secs = 300
data_dir = "/var/lib/news"

[[sources]]
name = "Local"
url = "http://127.0.0.1:9/rss"
category = "Test"
"#,
    )
    .unwrap();

    env::set_var(ENV_CONFIG_PATH, &path);
    env::set_var("POLL_INTERVAL_SECS", "45");
    env::set_var("WATCH_KEYWORDS", "storm,flood");

    let mut cfg = WorkerConfig::load(None).unwrap();
    cfg.validate().unwrap();

    assert_eq!(cfg.api_base_url, "http://from-file:8080");
    assert_eq!(cfg.poll_interval_secs, 45);
    assert_eq!(cfg.data_dir, std::path::PathBuf::from("/var/lib/news"));
    assert_eq!(cfg.keywords, vec!["storm".to_string(), "flood".to_string()]);
    assert_eq!(cfg.registry().len(), 1);
    assert_eq!(
        cfg.resolved_notify_endpoint().unwrap().as_deref(),
        Some("http://from-file:8080/api/notify")
    );
}

#[test]
#[serial]
fn keywords_path_replaces_inline_keywords() {
    let _env = CleanEnv::new();
    let tmp = tempfile::tempdir().unwrap();
    let kw = tmp.path().join("keywords.json");
    fs::write(&kw, r#"["Election", "election", "Merger"]"#).unwrap();
    let path = tmp.path().join("worker.toml");
    fs::write(
        &path,
        format!("keywords = [\"ignored\"]\nkeywords_path = {:?}\n", kw.display().to_string()),
    )
    .unwrap();

    let cfg = WorkerConfig::load(Some(&path)).unwrap();
    assert_eq!(cfg.keywords, vec!["Election".to_string(), "Merger".to_string()]);
}

#[test]
#[serial]
fn watch_keywords_env_beats_keywords_path() {
    let _env = CleanEnv::new();
    let tmp = tempfile::tempdir().unwrap();
    let kw = tmp.path().join("keywords.json");
    fs::write(&kw, r#"["from-file"]"#).unwrap();
    let path = tmp.path().join("worker.toml");
    fs::write(&path, format!("keywords_path = {:?}\n", kw.display().to_string())).unwrap();

    env::set_var("WATCH_KEYWORDS", "from-env");
    let mut cfg = WorkerConfig::load(Some(&path)).unwrap();
    cfg.validate().unwrap();
    assert_eq!(cfg.keywords, vec!["from-env".to_string()]);
}

#[test]
#[serial]
fn missing_or_broken_files_are_config_errors() {
    let _env = CleanEnv::new();
    let tmp = tempfile::tempdir().unwrap();

    env::set_var(ENV_CONFIG_PATH, tmp.path().join("absent.toml"));
    assert!(matches!(WorkerConfig::load(None), Err(ConfigError::Read { .. })));
    env::remove_var(ENV_CONFIG_PATH);

    let broken = tmp.path().join("broken.toml");
    fs::write(&broken, "poll_interval_secs = \"often\"").unwrap();
    assert!(matches!(
        WorkerConfig::load(Some(&broken)),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
#[serial]
fn invalid_env_value_is_rejected_before_start() {
    let _env = CleanEnv::new();
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("worker.toml");
    fs::write(&path, "").unwrap();

    env::set_var("NEWS_API_BASE_URL", "not a url");
    let mut cfg = WorkerConfig::load(Some(&path)).unwrap();
    assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
}
