use anyhow::Result;
use loqa_voice_agent::config::Config;
use std::io::Write;
use tempfile::NamedTempFile;

const BASE: &str = r#"
[service]
name = "loqa-voice-agent"

[service.http]
bind = "127.0.0.1"
port = 3000

[nats]
url = "nats://localhost:4222"

[speech]
language = "en-US"
"#;

fn write_config(dialogue: &str, agent: &str) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    write!(file, "{}\n{}\n{}", BASE, dialogue, agent)?;
    Ok(file)
}

fn path_of(file: &NamedTempFile) -> String {
    file.path().to_string_lossy().to_string()
}

#[test]
fn test_load_with_defaults() -> Result<()> {
    let file = write_config(
        r#"
[dialogue]
api_key = "file-key"
assistant_id = "assistant-1"
instance_url = "https://assistant.example.com"
api_version = "2021-06-14"
"#,
        "",
    )?;

    let cfg = Config::load(&path_of(&file))?;

    assert_eq!(cfg.service.http.port, 3000);
    assert_eq!(cfg.speech.language, "en-US");
    assert_eq!(cfg.dialogue.assistant_id, "assistant-1");
    assert_eq!(cfg.dialogue.request_timeout_secs, 30);
    assert_eq!(cfg.agent.greeting, None);
    assert!(cfg.agent.strip_trailing_period);

    Ok(())
}

#[test]
fn test_agent_section() -> Result<()> {
    let file = write_config(
        r#"
[dialogue]
api_key = "file-key"
assistant_id = "assistant-1"
instance_url = "https://assistant.example.com"
api_version = "2021-06-14"
request_timeout_secs = 5
"#,
        r#"
[agent]
greeting = "Hello, how can I help?"
strip_trailing_period = false
"#,
    )?;

    let cfg = Config::load(&path_of(&file))?;

    assert_eq!(cfg.dialogue.request_timeout_secs, 5);
    assert_eq!(cfg.agent.greeting.as_deref(), Some("Hello, how can I help?"));
    assert!(!cfg.agent.strip_trailing_period);

    Ok(())
}

#[test]
fn test_missing_assistant_rejected() -> Result<()> {
    let file = write_config(
        r#"
[dialogue]
api_key = "file-key"
assistant_id = "  "
instance_url = "https://assistant.example.com"
api_version = "2021-06-14"
"#,
        "",
    )?;

    let err = Config::load(&path_of(&file)).unwrap_err();
    assert!(err.to_string().contains("assistant_id"));

    Ok(())
}

#[test]
fn test_env_overrides_secret_and_debug_redacts() -> Result<()> {
    let file = write_config(
        r#"
[dialogue]
api_key = ""
assistant_id = "assistant-1"
instance_url = "https://assistant.example.com"
api_version = "2021-06-14"
"#,
        "",
    )?;

    std::env::set_var("LOQA_VOICE__DIALOGUE__API_KEY", "env-secret");
    let loaded = Config::load(&path_of(&file));
    std::env::remove_var("LOQA_VOICE__DIALOGUE__API_KEY");
    let cfg = loaded?;

    assert_eq!(cfg.dialogue.api_key, "env-secret");

    let debug = format!("{:?}", cfg.dialogue);
    assert!(!debug.contains("env-secret"));
    assert!(debug.contains("<redacted>"));

    Ok(())
}

#[test]
fn test_empty_api_key_rejected() -> Result<()> {
    let file = write_config(
        r#"
[dialogue]
api_key = "file-key"
assistant_id = "assistant-1"
instance_url = "https://assistant.example.com"
api_version = "2021-06-14"
"#,
        "",
    )?;

    let mut cfg = Config::load(&path_of(&file))?;
    cfg.dialogue.api_key = String::new();

    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("LOQA_VOICE__DIALOGUE__API_KEY"));

    Ok(())
}
