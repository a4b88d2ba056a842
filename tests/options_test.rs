use clap::Parser;
use sitegraph::options::{Cli, ConfigFile, defaults, parse_rate_limit};
use std::io::Write;
use tempfile::NamedTempFile;

// ===========================================================================================
// parse_rate_limit Tests
// ===========================================================================================

#[test]
fn test_parse_rate_limit_valid_inputs() {
    // 60 requests per second is 3600 per minute.
    assert_eq!(parse_rate_limit("60/1s"), Ok(3600));

    // 30 requests per 2 minutes is 15 per minute.
    assert_eq!(parse_rate_limit("30/2m"), Ok(15));

    // 360 requests per hour is 6 per minute.
    assert_eq!(parse_rate_limit("360/1h"), Ok(6));
}

#[test]
fn test_parse_rate_limit_invalid_formats() {
    // Missing slash.
    let result = parse_rate_limit("100m");
    assert_eq!(
        result.err().unwrap(),
        "Rate limit must be in the format 'requests/time[unit]'"
    );

    // Extra slash.
    let result = parse_rate_limit("50/2/m");
    assert_eq!(
        result.err().unwrap(),
        "Rate limit must be in the format 'requests/time[unit]'"
    );

    // Request count is not a number.
    let result = parse_rate_limit("xyz/1s");
    assert_eq!(result.err().unwrap(), "Invalid request count");

    // Time value is not a number.
    let result = parse_rate_limit("100/xyzs");
    assert_eq!(result.err().unwrap(), "Invalid time value");
}

#[test]
fn test_parse_rate_limit_invalid_units() {
    let result = parse_rate_limit("100/1d");
    assert_eq!(
        result.err().unwrap(),
        "Time unit must be one of 's', 'm' or 'h'"
    );
}

#[test]
fn test_parse_rate_limit_at_least_one_per_minute() {
    // One request per hour rounds below one per minute.
    let result = parse_rate_limit("1/1h");
    assert_eq!(
        result.err().unwrap(),
        "Rate limit must be at least one request per minute"
    );
}

// ===========================================================================================
// ConfigFile Tests
// ===========================================================================================

#[test]
fn test_config_file_deserialization_valid_toml() {
    let toml_str = r#"
user_agent = "MyBot/1.0"
concurrency_limit = 10
rate_limit = "100/1m"
request_timeout = 30
basic_auth = "user:pass"
follow_redirects = true
append_timestamp = true
max_depth = 3
max_pages = 50
damping = 0.9
report_csv = "/tmp/nodes.csv"
"#;

    let config: ConfigFile = toml::from_str(toml_str).expect("Failed to parse TOML");

    assert_eq!(config.user_agent.as_deref(), Some("MyBot/1.0"));
    assert_eq!(config.concurrency_limit, Some(10));
    assert_eq!(config.rate_limit.as_deref(), Some("100/1m"));
    assert_eq!(config.request_timeout, Some(30));
    assert_eq!(config.basic_auth.as_deref(), Some("user:pass"));
    assert_eq!(config.follow_redirects, Some(true));
    assert_eq!(config.append_timestamp, Some(true));
    assert_eq!(config.max_depth, Some(3));
    assert_eq!(config.max_pages, Some(50));
    assert_eq!(config.damping, Some(0.9));
    assert_eq!(config.report_csv.as_deref(), Some("/tmp/nodes.csv"));
}

#[test]
fn test_config_file_load_existing_path() {
    let mut tmp = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(
        tmp,
        r#"
concurrency_limit = 20
request_timeout = 60
"#
    )
    .expect("Failed to write temp file");

    let path = tmp.path().to_path_buf();
    let config = ConfigFile::load(Some(&path)).expect("Failed to load config");

    assert_eq!(config.concurrency_limit, Some(20));
    assert_eq!(config.request_timeout, Some(60));
}

#[test]
fn test_config_file_load_missing_explicit_path_fails() {
    let path = std::path::PathBuf::from("/definitely/not/here/sitegraph.toml");
    let result = ConfigFile::load(Some(&path));
    assert!(result.is_err());
    assert!(result.err().unwrap().starts_with("Config file not found"));
}

#[test]
fn test_config_file_load_invalid_toml_fails() {
    let mut tmp = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(tmp, "this is not toml = = =").expect("Failed to write temp file");

    let path = tmp.path().to_path_buf();
    assert!(ConfigFile::load(Some(&path)).is_err());
}

// ===========================================================================================
// apply_config Tests
// ===========================================================================================

#[test]
fn test_apply_config_fills_unset_values() {
    let mut options = Cli::parse_from(["sitegraph", "http://example.com/"]);
    let config = ConfigFile {
        user_agent: Some("ConfigBot/2.0".to_string()),
        concurrency_limit: Some(12),
        rate_limit: Some("120/1m".to_string()),
        max_depth: Some(2),
        damping: Some(0.5),
        follow_redirects: Some(true),
        ..Default::default()
    };

    options.apply_config(&config).unwrap();

    assert_eq!(options.user_agent, "ConfigBot/2.0");
    assert_eq!(options.concurrency_limit, 12);
    assert_eq!(options.rate_limit, Some(120));
    assert_eq!(options.max_depth, 2);
    assert_eq!(options.damping, 0.5);
    assert!(options.follow_redirects);
}

#[test]
fn test_apply_config_cli_arguments_take_priority() {
    let mut options = Cli::parse_from([
        "sitegraph",
        "http://example.com/",
        "-c",
        "2",
        "--user-agent",
        "CliBot/1.0",
    ]);
    let config = ConfigFile {
        user_agent: Some("ConfigBot/2.0".to_string()),
        concurrency_limit: Some(12),
        ..Default::default()
    };

    options.apply_config(&config).unwrap();

    assert_eq!(options.user_agent, "CliBot/1.0");
    assert_eq!(options.concurrency_limit, 2);
}

#[test]
fn test_apply_config_rejects_invalid_rate_limit() {
    let mut options = Cli::parse_from(["sitegraph", "http://example.com/"]);
    let config = ConfigFile {
        rate_limit: Some("garbage".to_string()),
        ..Default::default()
    };

    assert!(options.apply_config(&config).is_err());
}

#[test]
fn test_cli_defaults() {
    let options = Cli::parse_from(["sitegraph", "http://example.com/"]);
    assert_eq!(options.concurrency_limit, defaults::SEMAPHORE);
    assert_eq!(options.request_timeout, defaults::TIMEOUT as u8);
    assert_eq!(options.max_depth, defaults::MAX_DEPTH);
    assert_eq!(options.max_pages, defaults::MAX_PAGES);
    assert_eq!(options.damping, defaults::DAMPING);
    assert!(options.rate_limit.is_none());
    assert!(!options.json);
}
