// tests/config_files.rs
//
// Override documents for the source catalog and the scrape selectors,
// resolved from env vars and ./config fallbacks. Tests touching the process
// env or CWD run serially.

use std::{env, fs};

use news_aggregator::catalog::ENV_SOURCES_CONFIG_PATH;
use news_aggregator::config::selectors::ENV_SELECTORS_CONFIG_PATH;
use news_aggregator::{SelectorConfig, SourceCatalog};

#[test]
fn catalog_load_from_toml_and_json() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("sources.toml");
    fs::write(
        &p_toml,
        r#"
[[sources]]
name = "Reuters"
rss_url = "https://feeds.reuters.test/markets"
fallback_url = "https://www.reuters.test/markets/"
max_stories = 12

[[sources]]
name = "AP"
primary_url = "https://ap.test/rss"
fallback_url = "https://ap.test/"
enabled = false
"#,
    )
    .unwrap();
    let c = SourceCatalog::load_from(&p_toml).unwrap();
    assert_eq!(c.all().len(), 2);
    assert_eq!(c.enabled().len(), 1);
    assert_eq!(c.get("AP").unwrap().rss_url, "https://ap.test/rss");

    let p_json = dir.path().join("sources.json");
    fs::write(
        &p_json,
        r#"{"sources":[{"name":"X","rss_url":"https://x.test/rss","fallback_url":"https://x.test","max_stories":5}]}"#,
    )
    .unwrap();
    assert_eq!(SourceCatalog::load_from(&p_json).unwrap().all().len(), 1);
}

#[test]
fn catalog_rejects_out_of_range_entries() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("bad.json");
    fs::write(
        &p,
        r#"{"sources":[{"name":"X","rss_url":"https://x.test/rss","fallback_url":"https://x.test","max_stories":500}]}"#,
    )
    .unwrap();
    assert!(SourceCatalog::load_from(&p).is_err());
}

#[serial_test::serial]
#[test]
fn catalog_default_uses_env_then_fallbacks() {
    // Isolate CWD so the test never reads the repo's own config/.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    env::remove_var(ENV_SOURCES_CONFIG_PATH);

    // 1) Nothing present -> built-in six.
    assert_eq!(SourceCatalog::load_default().all().len(), 6);

    // 2) ./config/sources.json fallback.
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(
        cfg_dir.join("sources.json"),
        r#"{"sources":[{"name":"Local","rss_url":"https://l.test/rss","fallback_url":"https://l.test"}]}"#,
    )
    .unwrap();
    let c = SourceCatalog::load_default();
    assert_eq!(c.all().len(), 1);
    assert_eq!(c.all()[0].name, "Local");

    // 3) Env wins over fallbacks.
    let p_env = tmp.path().join("env.toml");
    fs::write(
        &p_env,
        "[[sources]]\nname = \"FromEnv\"\nrss_url = \"https://e.test/rss\"\nfallback_url = \"https://e.test\"\n",
    )
    .unwrap();
    env::set_var(ENV_SOURCES_CONFIG_PATH, &p_env);
    assert_eq!(SourceCatalog::load_default().all()[0].name, "FromEnv");

    // 4) Broken override -> silently back to built-ins.
    fs::write(&p_env, "this is not toml = [").unwrap();
    assert_eq!(SourceCatalog::load_default().all().len(), 6);

    env::remove_var(ENV_SOURCES_CONFIG_PATH);
    env::set_current_dir(old).unwrap();
}

#[serial_test::serial]
#[test]
fn selectors_default_uses_env_or_builtin() {
    env::remove_var(ENV_SELECTORS_CONFIG_PATH);
    assert_eq!(
        SelectorConfig::load_default().selectors_for("CNBC"),
        vec![".Card-title", "h3 a"]
    );

    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("selectors.json");
    fs::write(&p, r#"{"sources":{"CNBC":[".Latest a"]},"generic":["li a"]}"#).unwrap();
    env::set_var(ENV_SELECTORS_CONFIG_PATH, &p);
    let cfg = SelectorConfig::load_default();
    assert_eq!(cfg.selectors_for("CNBC"), vec![".Latest a"]);
    assert_eq!(cfg.selectors_for("Someone Else"), vec!["li a"]);

    fs::write(&p, "{ not json").unwrap();
    let fallback = SelectorConfig::load_default();
    assert!(fallback.sources.is_empty());

    env::remove_var(ENV_SELECTORS_CONFIG_PATH);
}
