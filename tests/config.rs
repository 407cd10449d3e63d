//! Configuration file plus environment overrides
use std::env;
use std::io::Write;

use docchat::config::{AssistantConfig, BackendKind};
use docchat::error::AssistantError;

const VARS: [&str; 4] = ["DOCCHAT_MODEL", "OLLAMA_HOST", "OPENROUTER_API_KEY", "OPENROUTER_ENDPOINT"];

// One test owns the environment; parallel tests would race on it.
#[test]
fn test_environment_overrides_toml_file() {
    for var in VARS {
        env::remove_var(var);
    }

    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        "model = \"llama3:8b\"\nbackend = \"openrouter\"\nollama_host = \"http://gpu-box:11434\"\ncontext_limit = 4000"
    )
    .unwrap();

    // File values alone
    let config = AssistantConfig::from_toml_file(file.path()).unwrap();
    assert_eq!(config.model, "llama3:8b");
    assert_eq!(config.backend, BackendKind::OpenRouter);
    assert_eq!(config.ollama_host, "http://gpu-box:11434");
    assert_eq!(config.context_limit, 4000);

    // Environment wins over the file
    env::set_var("DOCCHAT_MODEL", "llama3:70b");
    env::set_var("OPENROUTER_API_KEY", "sk-or-env");
    env::set_var("OPENROUTER_ENDPOINT", "https://proxy.example/api/");
    let config = AssistantConfig::from_toml_file(file.path()).unwrap();
    assert_eq!(config.model, "llama3:70b");
    assert_eq!(config.openrouter_api_key.as_deref(), Some("sk-or-env"));
    assert_eq!(config.openrouter_base_url, "https://proxy.example/api/v1");
    assert_eq!(config.context_limit, 4000);

    // Overrides are validated as part of loading
    env::set_var("OLLAMA_HOST", "http://[::1");
    let result = AssistantConfig::from_toml_file(file.path());
    assert!(matches!(result, Err(AssistantError::Config(_))));

    // Bare host:port from the environment
    env::set_var("OLLAMA_HOST", "10.0.0.5:11434");
    let config = AssistantConfig::from_env();
    assert_eq!(config.ollama_host, "http://10.0.0.5:11434");
    assert_eq!(config.model, "llama3:70b");
    assert!(config.validate().is_ok());

    for var in VARS {
        env::remove_var(var);
    }
}
