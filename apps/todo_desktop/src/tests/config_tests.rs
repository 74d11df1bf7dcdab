use super::*;

use std::{
    collections::HashMap,
    env, fs,
    path::PathBuf,
    sync::atomic::{AtomicU32, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

static NEXT_DIR: AtomicU32 = AtomicU32::new(0);

fn temp_config(contents: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = env::temp_dir().join(format!(
        "todo_desktop_config_test_{}_{suffix}_{}",
        std::process::id(),
        NEXT_DIR.fetch_add(1, Ordering::Relaxed)
    ));
    fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("todo.toml");
    fs::write(&path, contents).expect("write config");
    path
}

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn missing_file_yields_defaults() {
    let settings = load_settings_from(Path::new("/definitely/not/here/todo.toml"), no_env);
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.table, "todos");
}

#[test]
fn file_values_override_defaults() {
    let path = temp_config(
        r#"
service_url = "https://project.example.co"
service_api_key = "public-key"
table = "tasks"
"#,
    );

    let settings = load_settings_from(&path, no_env);
    assert_eq!(settings.service_url, "https://project.example.co");
    assert_eq!(settings.service_api_key, "public-key");
    assert_eq!(settings.table, "tasks");

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn malformed_file_is_ignored() {
    let path = temp_config("service_url = [1, 2");
    assert_eq!(load_settings_from(&path, no_env), Settings::default());
    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn environment_overrides_file_and_app_prefix_wins() {
    let path = temp_config(
        r#"
service_url = "https://from-file.example.co"
service_api_key = "file-key"
"#,
    );
    let vars = HashMap::from([
        ("TODO_SERVICE_URL", "https://todo-env.example.co"),
        ("APP__SERVICE_URL", "https://app-env.example.co"),
        ("TODO_SERVICE_API_KEY", "env-key"),
    ]);

    let settings = load_settings_from(&path, |name| vars.get(name).map(|v| v.to_string()));
    assert_eq!(settings.service_url, "https://app-env.example.co");
    assert_eq!(settings.service_api_key, "env-key");
    assert_eq!(settings.table, "todos");

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn validation_requires_url_key_and_table() {
    let valid = Settings {
        service_url: "https://project.example.co".into(),
        service_api_key: "public-key".into(),
        table: "todos".into(),
    };
    assert_eq!(valid.validate(), Ok(()));

    let missing_key = Settings {
        service_api_key: "  ".into(),
        ..valid.clone()
    };
    assert_eq!(missing_key.validate(), Err(ConfigError::MissingApiKey));

    let missing_url = Settings {
        service_url: String::new(),
        ..valid.clone()
    };
    assert_eq!(missing_url.validate(), Err(ConfigError::MissingServiceUrl));

    let missing_table = Settings {
        table: String::new(),
        ..valid.clone()
    };
    assert_eq!(missing_table.validate(), Err(ConfigError::MissingTable));

    let wrong_scheme = Settings {
        service_url: "ftp://project.example.co".into(),
        ..valid
    };
    assert!(matches!(
        wrong_scheme.validate(),
        Err(ConfigError::UnsupportedScheme(_))
    ));
}

#[test]
fn hosted_config_carries_table_and_normalized_url() {
    let settings = Settings {
        service_url: "https://project.example.co".into(),
        service_api_key: "public-key".into(),
        table: " tasks ".into(),
    };
    let hosted = settings.hosted_config().expect("hosted config");
    assert_eq!(hosted.service_url().as_str(), "https://project.example.co/");
    assert_eq!(hosted.table(), "tasks");
}
