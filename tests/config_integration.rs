use roomsync::config::AppConfig;
use roomsync::message::SortKey;
use serial_test::serial;
use std::env;
use std::fs;

// Helper to clear environment variables that might interfere with tests
fn clear_env_vars() {
    unsafe {
        env::remove_var("ROOMSYNC_DATABASE__URL");
        env::remove_var("ROOMSYNC_DATABASE__MAX_CONNECTIONS");
        env::remove_var("ROOMSYNC_CHAT__AUTHOR");
        env::remove_var("ROOMSYNC_CHAT__SORT_KEY");
        env::remove_var("ROOMSYNC_CHAT__CHANNEL");
        env::remove_var("CONFIG_FILE");
        env::remove_var("DATABASE_URL");
        env::remove_var("CHAT_AUTHOR");
        env::remove_var("CHAT_SORT_KEY");
    }
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = AppConfig::load_from_args(["roomsync"]).expect("defaults should load");

    assert_eq!(config.database.url, "postgres://localhost:5432/roomsync");
    assert_eq!(config.database.max_connections, 5);
    assert_eq!(config.chat.author, "anonymous");
    assert_eq!(config.chat.sort_key(), SortKey::Id);
    assert_eq!(config.chat.channel, "messages_changes");
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("ROOMSYNC_CHAT__AUTHOR", "ada");
        env::set_var("ROOMSYNC_DATABASE__MAX_CONNECTIONS", "9");
    }

    let config = AppConfig::load_from_args(["roomsync"]).expect("Failed to load config");
    assert_eq!(config.chat.author, "ada");
    assert_eq!(config.database.max_connections, 9);

    clear_env_vars();
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    clear_env_vars();
    unsafe {
        env::set_var("ROOMSYNC_CHAT__AUTHOR", "env-author");
    }

    let config = AppConfig::load_from_args(["roomsync", "--author", "cli-author"])
        .expect("Failed to load config");
    assert_eq!(config.chat.author, "cli-author");

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() {
    clear_env_vars();

    let config_content = r#"
chat:
  author: filed
  sort_key: created_at
    "#;

    let file_path = "test_config.yaml";
    fs::write(file_path, config_content).expect("Failed to write temp config");

    // CONFIG_FILE reaches the loader through the clap env hook.
    unsafe {
        env::set_var("CONFIG_FILE", file_path);
    }

    let config = AppConfig::load_from_args(["roomsync"]).expect("Failed to load config from file");
    assert_eq!(config.chat.author, "filed");
    assert_eq!(config.chat.sort_key(), SortKey::CreatedAt);

    fs::remove_file(file_path).unwrap();
    clear_env_vars();
}

#[test]
#[serial]
fn test_unknown_sort_key_falls_back_to_id() {
    clear_env_vars();

    let config = AppConfig::load_from_args(["roomsync", "--sort-key", "bogus"])
        .expect("Failed to load config");
    assert_eq!(config.chat.sort_key(), SortKey::Id);

    clear_env_vars();
}
