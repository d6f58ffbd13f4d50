//! Configuration surface: arena TOML files, preset resolution, validation.

use std::fs;

use rstest::rstest;

use chatbot_arena::config::{ArenaFileConfig, DEFAULT_ENABLED_BOTS, DEFAULT_MAX_BOTS};
use chatbot_arena::{Arena, ArenaError, GenerationRequest, ReplyGenerator, ReplyStream};

struct StubGenerator;

impl ReplyGenerator for StubGenerator {
    fn generate(&self, _request: GenerationRequest) -> ReplyStream {
        Box::pin(tokio_stream::iter(vec![Ok("stub".to_string())]))
    }
}

#[test]
fn default_file_config_matches_stock_roster() {
    let config = ArenaFileConfig::default()
        .into_session_config(None)
        .unwrap();
    assert_eq!(config.bots.len(), DEFAULT_ENABLED_BOTS);
    assert_eq!(config.max_bots, DEFAULT_MAX_BOTS);
    assert_eq!(config.bots[0].identifier, "Bot 1");
}

#[test]
fn file_config_round_trips_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("arena.toml");
    fs::write(
        &path,
        r#"
            [common]
            user_name = "Tester"
            greeting = "Ready."

            [[bots]]
            enabled = true
            identifier = "Alpha"
            context = "Be terse."

            [[bots]]
            enabled = false
            identifier = "Disabled"
        "#,
    )
    .unwrap();

    let config = ArenaFileConfig::load(&path)
        .unwrap()
        .into_session_config(None)
        .unwrap();
    assert_eq!(config.common.user_name, "Tester");
    assert_eq!(config.common.greeting.as_deref(), Some("Ready."));
    assert_eq!(config.bots.len(), 1);
    assert_eq!(config.bots[0].identifier, "Alpha");
}

#[test]
fn missing_file_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ArenaFileConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ArenaError::Configuration(_)));
}

#[test]
fn preset_resolution_feeds_bot_params() {
    let dir = tempfile::tempdir().unwrap();
    let preset_dir = dir.path().join("presets");
    fs::create_dir(&preset_dir).unwrap();
    fs::write(preset_dir.join("cold.toml"), "temperature = 0.1\n").unwrap();

    let file = ArenaFileConfig::from_toml_str(
        r#"
            [[bots]]
            enabled = true
            identifier = "Chilly"
            preset = "cold"
        "#,
    )
    .unwrap();
    let config = file.into_session_config(Some(&preset_dir)).unwrap();
    assert_eq!(
        config.bots[0].params.get("temperature"),
        Some(&serde_json::json!(0.1))
    );
}

#[rstest]
#[case("", "no bots")]
#[case(
    r#"
        [[bots]]
        enabled = true
        identifier = "   "
    "#,
    "blank identifier"
)]
fn bad_rosters_are_rejected(#[case] body: &str, #[case] label: &str) {
    let file = ArenaFileConfig::from_toml_str(body).unwrap();
    let result = file.into_session_config(None);
    assert!(result.is_err(), "expected rejection for {}", label);
}

#[test]
fn over_cap_roster_is_rejected() {
    let mut body = String::from("max_bots = 2\n");
    for i in 0..3 {
        body.push_str(&format!(
            "[[bots]]\nenabled = true\nidentifier = \"Bot {}\"\n",
            i + 1
        ));
    }
    let file = ArenaFileConfig::from_toml_str(&body).unwrap();
    assert!(file.into_session_config(None).is_err());
}

#[tokio::test]
async fn loaded_config_drives_a_session() {
    let file = ArenaFileConfig::from_toml_str(
        r#"
            [common]
            greeting = "Hi."

            [[bots]]
            enabled = true
            identifier = "Solo"
        "#,
    )
    .unwrap();
    let config = file.into_session_config(None).unwrap();

    let mut arena = Arena::new(StubGenerator);
    arena.start_session(config).unwrap();
    arena.submit_message("hello").await.unwrap();
    arena.accept_reply("Solo").unwrap();
    assert_eq!(arena.snapshot().rounds_completed, 1);
}
