use std::ffi::OsString;
use std::fs;

use tempfile::TempDir;

use modem_config::Config;

#[test]
fn malformed_config_file_fails_loading() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let path = temp_dir.path().join("modemd.toml");
    fs::write(&path, "wakeup_attempts = \"several\"\n").expect("write malformed config");

    let args = vec![
        OsString::from("modemd"),
        OsString::from("--config-path"),
        path.into_os_string(),
    ];

    let error = Config::load_from_iter(args).expect_err("loading must fail");
    assert!(!error.to_string().is_empty());
}

#[test]
fn unsupported_socket_scheme_fails_loading() {
    let args = vec![
        OsString::from("modemd"),
        OsString::from("--daemon-socket"),
        OsString::from("tcp://127.0.0.1:9000"),
    ];

    let error = Config::load_from_iter(args).expect_err("loading must fail");
    assert!(!error.to_string().is_empty());
}

#[test]
fn numeric_flags_override_defaults() {
    let args = vec![
        OsString::from("modemd"),
        OsString::from("--at-timeout-ms"),
        OsString::from("750"),
    ];

    let config = Config::load_from_iter(args).expect("load configuration");
    assert_eq!(config.at_timeout_ms, 750);
}
