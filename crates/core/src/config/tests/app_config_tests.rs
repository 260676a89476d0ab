use crate::config::models::AppConfig;

#[test]
fn test_default_config_is_valid() {
    let config = AppConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.scheduler.max_concurrent_jobs, 1);
    assert_eq!(config.consistency.max_chars, 4000);
    assert_eq!(config.consistency.requests_per_cycle, 30);
    assert_eq!(config.test_cases.max_candidates, 7);
    assert_eq!(config.test_cases.chunk_size, 50);
    assert!(config.test_cases.max_workers.is_none());
}

#[test]
fn test_partial_toml_falls_back_to_defaults() {
    let toml_str = r#"
[scheduler]
max_concurrent_jobs = 3

[test_cases]
similarity_threshold = 0.5
max_workers = 4
"#;

    let config = AppConfig::from_toml(toml_str).unwrap();
    assert_eq!(config.scheduler.max_concurrent_jobs, 3);
    assert_eq!(config.test_cases.similarity_threshold, 0.5);
    assert_eq!(config.test_cases.max_workers, Some(4));
    assert_eq!(config.test_cases.match_batch_size, 5);
    assert_eq!(config.completion.provider, "openai");
    assert_eq!(config.observability.log_format, "pretty");
}

#[test]
fn test_toml_roundtrip_keeps_values() {
    let mut config = AppConfig::default();
    config.completion.provider = "azure".to_string();
    config.completion.model = "gpt4-deployment".to_string();

    let toml_str = config.to_toml().unwrap();
    let parsed = AppConfig::from_toml(&toml_str).unwrap();
    assert_eq!(parsed.completion.provider, "azure");
    assert_eq!(parsed.completion.model, "gpt4-deployment");
}
