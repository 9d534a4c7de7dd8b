use super::*;
use tempfile::TempDir;

#[test]
fn test_glob_match() {
    // ** patterns
    assert!(glob_match("**/vendor/**", "src/vendor/lib/foo.go"));
    assert!(glob_match("**/vendor/**", "vendor/foo.go"));
    assert!(!glob_match("**/vendor/**", "src/vendorized/foo.go"));
    assert!(glob_match("**/*.min.js", "web/app.min.js"));
    assert!(glob_match("src/**/gen.rs", "src/a/b/gen.rs"));
    assert!(!glob_match("src/**/gen.rs", "lib/a/gen.rs"));

    // Single star
    assert!(glob_match("*.test.ts", "foo.test.ts"));
    assert!(!glob_match("*.test.ts", "foo.ts"));

    // Prefix patterns
    assert!(glob_match("generated/", "generated/model.py"));
    assert!(glob_match("vendor/", "vendor/lib/foo.py"));
    assert!(!glob_match("vendor/", "src/vendor/foo.py"));
}

#[test]
fn test_effective_patterns() {
    let exclude = ExcludeConfig {
        paths: vec!["generated/".into(), "**/vendor/**".into()],
        skip_defaults: false,
    };
    let patterns = exclude.effective_patterns();
    assert_eq!(patterns.len(), DEFAULT_EXCLUDE_PATTERNS.len() + 1);
    assert!(exclude.is_excluded("node_modules/react/index.js"));
    assert!(exclude.is_excluded("generated/api.go"));
    assert!(!exclude.is_excluded("src/main.go"));

    let only_user = ExcludeConfig {
        paths: vec!["generated/".into()],
        skip_defaults: true,
    };
    assert_eq!(only_user.effective_patterns(), vec!["generated/".to_string()]);
    assert!(!only_user.is_excluded("node_modules/react/index.js"));
}

#[test]
fn test_defaults() {
    let config = ProjectConfig::default();
    assert_eq!(config.graph.max_file_size, 2 * 1024 * 1024);
    assert_eq!(config.graph.workers, None);
    assert_eq!(config.smells.scope, GraphScope::File);
    assert_eq!(config.smells.thresholds.hub_degree, 20);
    assert_eq!(config.dead_code.min_confidence, 0.5);
    assert!(!config.dead_code.exported_entry_points);
    assert_eq!(config.metrics.resolution, 1.0);
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_toml_config() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("repotoire.toml"),
        r#"
[graph]
workers = 4
dispatch_confidence = 0.6

[smells]
scope = "symbol"
god_fan_in = 5

[rank]
top_n = 10

[dead_code]
exported_entry_points = true

[exclude]
paths = ["generated/"]
"#,
    )
    .unwrap();

    let config = load_project_config(dir.path());
    assert_eq!(config.graph.workers, Some(4));
    assert_eq!(config.graph.dispatch_confidence, 0.6);
    assert_eq!(config.smells.scope, GraphScope::Symbol);
    assert_eq!(config.smells.thresholds.god_fan_in, 5);
    // unset keys keep their defaults
    assert_eq!(config.smells.thresholds.god_fan_out, 10);
    assert_eq!(config.rank.top_n, 10);
    assert_eq!(config.rank.damping, 0.85);
    assert!(config.dead_code.exported_entry_points);
    assert_eq!(config.exclude.paths, vec!["generated/".to_string()]);
}

#[test]
fn test_load_json_config() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(".repotoirerc.json"),
        r#"{"dead_code": {"min_confidence": 0.8}, "rank": {"damping": 0.9}}"#,
    )
    .unwrap();

    let config = load_project_config(dir.path());
    assert_eq!(config.dead_code.min_confidence, 0.8);
    assert_eq!(config.rank.damping, 0.9);
}

#[test]
fn test_invalid_config_falls_back() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("repotoire.toml"), "[rank]\ndamping = 3.0\n").unwrap();
    std::fs::write(
        dir.path().join(".repotoirerc.json"),
        r#"{"rank": {"top_n": 7}}"#,
    )
    .unwrap();

    // the invalid TOML is skipped and the JSON file is used
    let config = load_project_config(dir.path());
    assert_eq!(config.rank.top_n, 7);
    assert_eq!(config.rank.damping, 0.85);

    let err = load_toml_config(&dir.path().join("repotoire.toml")).unwrap_err();
    assert!(matches!(err, GraphError::Config { .. }));
}

#[test]
fn test_missing_config_uses_defaults() {
    let dir = TempDir::new().unwrap();
    assert_eq!(load_project_config(dir.path()), ProjectConfig::default());
}

#[test]
fn test_metrics_section() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("repotoire.toml"),
        "[metrics]\nscope = \"symbol\"\nresolution = 0.5\n",
    )
    .unwrap();
    let config = load_project_config(dir.path());
    assert_eq!(config.metrics.scope, GraphScope::Symbol);
    assert_eq!(config.metrics.resolution, 0.5);
    assert_eq!(config.metrics.diameter_samples, 100);

    std::fs::write(
        dir.path().join("repotoire.toml"),
        "[metrics]\ndiameter_samples = 0\n",
    )
    .unwrap();
    let err = load_toml_config(&dir.path().join("repotoire.toml")).unwrap_err();
    assert!(matches!(err, GraphError::Config { .. }));
}
