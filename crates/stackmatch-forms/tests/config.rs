use std::fs;
use std::time::Duration;

use rfq_form_spec::NavigationPolicy;
use stackmatch_forms::{ConfigError, ConfigSource, EngineConfig, SubmitCleanup};

const ENGINE_TOML: &str = include_str!("fixtures/engine.toml");

#[test]
fn defaults_are_strict() {
    let config = EngineConfig::default();
    let policy = config.form_policy();
    assert_eq!(policy.navigation, NavigationPolicy::Strict);
    assert!(policy.required.default_required);
    assert!(policy.completion.require_complete);
    assert_eq!(config.autosave_interval(), Some(Duration::from_secs(5)));
    assert_eq!(config.submit_cleanup, SubmitCleanup::Clear);
}

#[test]
fn parses_fixture() {
    let config =
        EngineConfig::from_toml_str(ENGINE_TOML, "engine.toml".as_ref()).expect("config");
    assert_eq!(config.navigation, NavigationPolicy::AllowSkip);
    assert!(!config.require_complete_submission);
    assert_eq!(config.autosave_interval(), None);
    assert_eq!(config.submission_timeout(), Duration::from_secs(3));
    assert_eq!(config.submit_cleanup, SubmitCleanup::Archive);
}

#[test]
fn partial_files_keep_defaults() {
    let config = EngineConfig::from_toml_str("default_required = false\n", "x.toml".as_ref())
        .expect("config");
    assert!(!config.default_required);
    assert_eq!(config.submission_timeout_secs, 15);
}

#[test]
fn rejects_unknown_keys_and_bad_values() {
    let err = EngineConfig::from_toml_str("autosave = 3\n", "x.toml".as_ref()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));

    let err = EngineConfig::from_toml_str("submission_timeout_secs = 0\n", "x.toml".as_ref())
        .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));

    for base in ["ftp://example.test", "http://", "https://exa mple.test", "api.test"] {
        let raw = format!("submission_base_url = \"{base}\"\n");
        let err = EngineConfig::from_toml_str(&raw, "x.toml".as_ref()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{base}");
    }
    EngineConfig::from_toml_str(
        "submission_base_url = \"https://api.stackmatch.test/v1\"\n",
        "x.toml".as_ref(),
    )
    .expect("valid url");
}

#[test]
fn resolution_prefers_flag_then_env_then_user_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let flag = dir.path().join("flag.toml");
    let env = dir.path().join("env.toml");
    let user = dir.path().join("user.toml");
    fs::write(&flag, "submission_timeout_secs = 1\n").unwrap();
    fs::write(&env, "submission_timeout_secs = 2\n").unwrap();
    fs::write(&user, "submission_timeout_secs = 3\n").unwrap();

    let (config, source) =
        EngineConfig::resolve_from(Some(&flag), Some(env.clone()), Some(user.clone()))
            .expect("flag");
    assert_eq!(config.submission_timeout_secs, 1);
    assert_eq!(source, ConfigSource::Flag(flag.clone()));

    let (config, source) =
        EngineConfig::resolve_from(None, Some(env.clone()), Some(user.clone())).expect("env");
    assert_eq!(config.submission_timeout_secs, 2);
    assert_eq!(source, ConfigSource::Env(env));

    let (config, source) =
        EngineConfig::resolve_from(None, None, Some(user.clone())).expect("user");
    assert_eq!(config.submission_timeout_secs, 3);
    assert_eq!(source, ConfigSource::UserConfig(user));

    let (config, source) =
        EngineConfig::resolve_from(None, None, Some(dir.path().join("absent.toml")))
            .expect("defaults");
    assert_eq!(config, EngineConfig::default());
    assert_eq!(source, ConfigSource::Defaults);
}

#[test]
fn explicit_paths_must_exist() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("missing.toml");
    let err = EngineConfig::resolve_from(Some(&missing), None, None).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn draft_dir_override_wins() {
    let config = EngineConfig {
        draft_dir: Some("/tmp/drafts".into()),
        ..EngineConfig::default()
    };
    assert_eq!(config.draft_dir(), Some("/tmp/drafts".into()));
}
