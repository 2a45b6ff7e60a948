use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use capsolve::{ProbeRequest, explain, probe};
use capsolve_context::RunConfig;
use tempfile::TempDir;

const CENTRAL: &str = r#"{
    "name": "central",
    "resources": [
        {
            "capabilities": [
                { "namespace": "osgi.identity",
                  "attributes": { "osgi.identity": "org.apache.felix.framework", "version:Version": "4.0.2" } },
                { "namespace": "osgi.contract",
                  "attributes": { "osgi.contract": "OSGiFramework" } },
                { "namespace": "osgi.wiring.package",
                  "attributes": { "osgi.wiring.package": "org.osgi.framework", "version:Version": "1.7" } }
            ]
        },
        {
            "capabilities": [
                { "namespace": "osgi.identity",
                  "attributes": { "osgi.identity": "a", "version:Version": "1.0" } },
                { "namespace": "osgi.wiring.package",
                  "attributes": { "osgi.wiring.package": "com.x", "version:Version": "1.0" } }
            ]
        }
    ]
}"#;

const EXTRA: &str = r#"{
    "resources": [
        {
            "capabilities": [
                { "namespace": "osgi.identity",
                  "attributes": { "osgi.identity": "b", "version:Version": "1.0" } },
                { "namespace": "osgi.wiring.package",
                  "attributes": { "osgi.wiring.package": "com.x", "version:Version": "1.2" } }
            ]
        }
    ]
}"#;

const RUN: &str = r#"
ee = "JavaSE-1.7"
framework = { identity = "org.apache.felix.framework" }

[[requires]]
namespace = "osgi.wiring.package"
filter = "(osgi.wiring.package=com.x)"
"#;

fn write(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, contents)?;
    Ok(path)
}

fn fixture() -> Result<(TempDir, RunConfig, Vec<PathBuf>)> {
    let dir = tempfile::tempdir()?;
    let config = RunConfig::from_path(&write(dir.path(), "run.toml", RUN)?)?;
    let indexes = vec![
        write(dir.path(), "central.json", CENTRAL)?,
        write(dir.path(), "extra.json", EXTRA)?,
    ];
    Ok((dir, config, indexes))
}

#[test]
fn probe_ranks_providers_from_every_index() -> Result<()> {
    let (_dir, config, indexes) = fixture()?;
    let outcome = probe(ProbeRequest {
        config,
        indexes,
        requirements: Vec::new(),
    })?;

    assert_eq!(outcome.execution_environment, "JavaSE-1.7");
    assert_eq!(outcome.repositories, vec!["central".to_string(), "extra".to_string()]);
    assert_eq!(outcome.framework.as_deref(), Some("org.apache.felix.framework 4.0.2"));
    assert_eq!(outcome.mandatory_resources.as_ref().map(Vec::len), Ok(2));

    assert_eq!(outcome.lookups.len(), 1);
    let providers = &outcome.lookups[0].providers;
    assert_eq!(providers.len(), 2);
    assert!(providers[0].starts_with("b@1.0.0"), "{providers:?}");
    assert!(providers[1].starts_with("a@1.0.0"), "{providers:?}");
    assert!(outcome.failed.is_empty());
    assert_eq!(outcome.repository_queries, 2);

    let rendered = outcome.to_string();
    assert!(rendered.contains("framework: org.apache.felix.framework 4.0.2"));
    assert!(rendered.contains("  1. b@1.0.0"));
    Ok(())
}

#[test]
fn command_line_requirements_replace_descriptor_requirements() -> Result<()> {
    let (_dir, config, indexes) = fixture()?;
    let outcome = probe(ProbeRequest {
        config,
        indexes,
        requirements: vec![
            r#"osgi.wiring.package;filter:="(osgi.wiring.package=javax.annotation)""#.to_string(),
            r#"osgi.wiring.package;filter:="(osgi.wiring.package=com.missing)""#.to_string(),
        ],
    })?;

    assert_eq!(outcome.lookups.len(), 2);
    assert_eq!(outcome.lookups[0].providers.len(), 1);
    assert!(outcome.lookups[0].providers[0].starts_with("org.apache.felix.framework@4.0.2"));
    assert!(outcome.lookups[1].providers.is_empty());
    assert_eq!(outcome.failed.len(), 1);
    assert!(outcome.to_string().contains("<no providers>"));
    Ok(())
}

#[test]
fn missing_framework_is_reported_not_fatal() -> Result<()> {
    let (_dir, _config, indexes) = fixture()?;
    let outcome = probe(ProbeRequest {
        config: RunConfig::default(),
        indexes,
        requirements: vec![
            r#"osgi.wiring.package;filter:="(osgi.wiring.package=com.x)""#.to_string(),
        ],
    })?;

    assert_eq!(outcome.framework, None);
    let err = outcome.mandatory_resources.clone().unwrap_err();
    assert!(err.contains("could not find framework"));
    assert_eq!(outcome.lookups[0].providers.len(), 2);

    let json = serde_json::to_value(&outcome)?;
    assert!(json["mandatory_resources"]["Err"].is_string());
    assert_eq!(json["lookups"][0]["providers"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[test]
fn explain_prints_initialization_report() -> Result<()> {
    let (_dir, config, indexes) = fixture()?;
    let report = explain(ProbeRequest {
        config,
        indexes,
        requirements: Vec::new(),
    })?;
    assert!(report.contains("execution environment: JavaSE-1.7"));
    assert!(report.contains("repositories: central, extra"));
    assert!(report.contains("osgi.wiring.package: (osgi.wiring.package=com.x)"));
    Ok(())
}

#[test]
fn malformed_index_names_the_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let broken = write(dir.path(), "broken.json", "{ not json")?;
    let err = probe(ProbeRequest {
        indexes: vec![broken],
        ..ProbeRequest::default()
    })
    .unwrap_err();
    assert!(format!("{err:#}").contains("broken.json"));
    Ok(())
}
