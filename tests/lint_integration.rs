//! Integration tests for corpus linting

use nlg_templates::{Engine, EngineConfig, LintCategory, LoadError};

const CORPORA: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/corpora");

#[test]
fn test_true_positives_all_categories() {
    let source = include_str!("lint-fixtures/true-positives.nlg");
    let engine = Engine::from_source(source).expect("Should load");
    let warnings = engine.lint();

    assert!(!warnings.is_empty(), "Expected lint warnings for true-positives");

    let categories: Vec<String> = warnings.iter().map(|w| w.category.to_string()).collect();
    for expected in ["placeholder", "function", "arity", "formatter"] {
        assert!(
            categories.contains(&expected.to_string()),
            "Expected {} warning, got: {:?}",
            expected,
            categories
        );
    }
    assert_eq!(warnings.len(), 4);
}

#[test]
fn test_true_negatives_clean() {
    let source = include_str!("lint-fixtures/true-negatives.nlg");
    let engine = Engine::from_source(source).expect("Should load");
    let warnings = engine.lint();
    assert!(
        warnings.is_empty(),
        "Expected no warnings, got: {:?}",
        warnings.iter().map(|w| w.to_string()).collect::<Vec<_>>()
    );
}

#[test]
fn test_warnings_follow_source_order() {
    let source = include_str!("lint-fixtures/true-positives.nlg");
    let engine = Engine::from_source(source).expect("Should load");
    let categories: Vec<LintCategory> = engine.lint().iter().map(|w| w.category).collect();
    assert_eq!(
        categories,
        vec![
            LintCategory::Placeholder,
            LintCategory::Function,
            LintCategory::Arity,
            LintCategory::Formatter,
        ]
    );
}

#[test]
fn test_warning_display() {
    let engine = Engine::from_source(r#"template t(name): "{name} {value}""#).unwrap();
    let warnings = engine.lint();
    assert_eq!(
        warnings[0].to_string(),
        "[placeholder] t(name): placeholder 'value' is not a declared parameter"
    );
}

#[test]
fn test_shipped_corpora_are_clean() {
    for file in ["restaurants.nlg", "restaurants_terse.nlg"] {
        let path = format!("{}/{}", CORPORA, file);
        let source = std::fs::read_to_string(&path).expect("corpus should exist");
        let engine = Engine::from_source(&source).expect("corpus should load");
        let warnings = engine.lint();
        assert!(
            warnings.is_empty(),
            "{} has lint warnings: {:?}",
            file,
            warnings.iter().map(|w| w.to_string()).collect::<Vec<_>>()
        );
    }
}

#[test]
fn test_strict_config_rejects_lint_warnings() {
    let dir = std::env::temp_dir().join(format!("nlg-templates-lint-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let corpus = dir.join("slips.nlg");
    std::fs::write(&corpus, include_str!("lint-fixtures/true-positives.nlg")).unwrap();

    let strict = EngineConfig::new(&corpus).with_strict(true);
    match Engine::from_config(&strict) {
        Err(LoadError::Lint(warnings)) => assert_eq!(warnings.len(), 4),
        other => panic!("expected lint failure, got {:?}", other.map(|_| ())),
    }

    // Without strict mode the same corpus loads and only logs
    let lenient = EngineConfig::new(&corpus);
    assert!(Engine::from_config(&lenient).is_ok());

    std::fs::remove_dir_all(&dir).ok();
}
