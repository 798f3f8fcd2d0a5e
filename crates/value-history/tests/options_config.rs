use value_history::{DiffStrategy, HistoryOptions};

#[test]
fn options_load_from_toml() {
    let options: HistoryOptions = toml::from_str(r#"strategy = "structural""#).unwrap();
    assert_eq!(options.strategy, DiffStrategy::Structural);
}

#[test]
fn empty_toml_uses_defaults() {
    let options: HistoryOptions = toml::from_str("").unwrap();
    assert_eq!(options, HistoryOptions::default());
    assert_eq!(options.strategy, DiffStrategy::Merge);
}

#[test]
fn unknown_keys_and_strategies_are_rejected() {
    assert!(toml::from_str::<HistoryOptions>(r#"strategy = "snapshot""#).is_err());
    assert!(toml::from_str::<HistoryOptions>("max_entries = 3").is_err());
}
