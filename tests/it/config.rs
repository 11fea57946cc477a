use crate::common::CONFIG_YAML;
use abstract_classifier::prelude::*;
use std::fs;

#[test]
fn mismatched_groups_fail_before_any_client_exists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(&path, CONFIG_YAML.replace("\"Y,N\"", "\"Y,N,Y\"")).unwrap();

    let result = ClassifierConfig::from_yaml_path(&path);

    assert!(matches!(
        result,
        Err(ConfigError::GroupAnswerCountMismatch {
            groups: 2,
            answers: 3
        })
    ));
}

#[test]
fn dataset_resolves_next_to_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(&path, CONFIG_YAML).unwrap();

    let config = ClassifierConfig::from_yaml_path(&path).unwrap();

    assert_eq!(config.dataset_path, dir.path().join("papers.csv"));
    assert_eq!(config.keyword_groups[0].keywords, ["cancer", "tumor"]);
    assert_eq!(config.keyword_groups[1].example_answer, Verdict::No);
}

#[test]
fn overrides_are_validated() {
    let config = ClassifierConfig::from_yaml_str(CONFIG_YAML)
        .unwrap()
        .with_concurrency(0);
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Zero {
            field: "concurrency"
        })
    ));
}
