//! Loading configuration from YAML files and the environment

use devcamper::prelude::*;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

#[test]
fn test_load_without_file_uses_defaults() {
    let config = AppConfig::default();
    assert_eq!(config.bind_address(), "127.0.0.1:5000");
    assert_eq!(config.auth.jwt_expire_days, 30);
    assert_eq!(config.upload.max_file_upload, 1_000_000);
    assert_eq!(config.database.name, "devcamper");
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
server:
  host: 0.0.0.0
  port: 8000
auth:
  jwt_secret: file-secret
upload:
  file_upload_path: /var/devcamper/uploads
database:
  mongo_uri: mongodb://localhost:27017
  name: devcamper_test
"#
    )
    .unwrap();

    let config = AppConfig::from_yaml_file(file.path().to_str().unwrap()).unwrap();
    assert_eq!(config.bind_address(), "0.0.0.0:8000");
    assert_eq!(config.auth.jwt_secret, "file-secret");
    assert_eq!(config.auth.cookie_expire_days, 30);
    assert_eq!(
        config.upload.file_upload_path,
        PathBuf::from("/var/devcamper/uploads")
    );
    assert_eq!(
        config.database.mongo_uri.as_deref(),
        Some("mongodb://localhost:27017")
    );
    assert_eq!(config.database.name, "devcamper_test");
}

#[test]
fn test_missing_file_is_an_error() {
    let err = AppConfig::from_yaml_file("/definitely/not/here.yaml").unwrap_err();
    assert!(err.to_string().contains("/definitely/not/here.yaml"));
}

#[test]
fn test_malformed_yaml_is_an_error() {
    assert!(AppConfig::from_yaml_str("server: [unclosed").is_err());
    assert!(AppConfig::from_yaml_str("server:\n  port: not-a-port").is_err());
}

#[test]
fn test_environment_overrides_file_values() {
    let mut config = AppConfig::from_yaml_str("server:\n  port: 8000\n").unwrap();
    let env = HashMap::from([
        ("PORT", "9000"),
        ("JWT_SECRET", "env-secret"),
        ("JWT_COOKIE_EXPIRE", "14"),
        ("FILE_UPLOAD_PATH", "/tmp/photos"),
        ("MONGO_URI", "mongodb://db:27017"),
    ]);
    config
        .apply_env_overrides_from(|key| env.get(key).map(|v| v.to_string()))
        .unwrap();

    assert_eq!(config.server.port, 9000);
    assert_eq!(config.auth.jwt_secret, "env-secret");
    assert_eq!(config.auth.cookie_expire_days, 14);
    assert_eq!(config.upload.file_upload_path, PathBuf::from("/tmp/photos"));
    assert_eq!(config.database.mongo_uri.as_deref(), Some("mongodb://db:27017"));
    assert!(!config.auth.secure_cookies);
}

#[test]
fn test_zipcode_table_feeds_the_geocoder() {
    let config = AppConfig::from_yaml_str(
        r#"
geocoder:
  zipcodes:
    "02118":
      latitude: 42.3389
      longitude: -71.0720
      city: Boston
      state: MA
"#,
    )
    .unwrap();

    let entry = &config.geocoder.zipcodes["02118"];
    assert_eq!(entry.city.as_deref(), Some("Boston"));
    assert!(entry.country.is_none());
}

#[test]
fn test_query_limits_never_drop_below_one() {
    let config = AppConfig::from_yaml_str("query:\n  default_limit: 0\n  max_limit: 0\n").unwrap();
    let options = config.query.options();
    assert_eq!(options.default_limit, 1);
    assert_eq!(options.max_limit, Some(1));
}

#[test]
fn test_max_limit_is_unset_by_default() {
    let config = AppConfig::from_yaml_str("query:\n  default_limit: 10\n").unwrap();
    assert_eq!(config.query.max_limit, None);
    assert_eq!(config.query.options().max_limit, None);
}
