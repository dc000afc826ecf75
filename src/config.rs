//! Configuration discovery and effective settings resolution.
//!
//! bladeaudit reads `bladeaudit.toml|yaml|yml` from the project root (or the
//! closest ancestor) and merges it with CLI flags to produce an `Effective`
//! config.
//! Defaults:
//! - `paths`: `["resources/views"]`
//! - `extensions`: `["blade.php", "php", "css", "html"]`
//! - `host_version`: detected from `composer.lock`, else `6.0.0`
//! - `output`: `human`
//!
//! Overrides precedence: CLI > config file > defaults.

use crate::compiler::BladeCompiler;
use crate::error::{AuditError, Result};
use crate::models::HostVersion;
use crate::resolver::FileViewFinder;
use crate::warnings::{Rule, WarningEngine};
use serde::Deserialize;
use serde_json::Value as Json;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILES: [&str; 3] = ["bladeaudit.toml", "bladeaudit.yaml", "bladeaudit.yml"];
const FRAMEWORK_PACKAGE: &str = "laravel/framework";

#[derive(Debug, Default, Deserialize, Clone)]
/// A custom directive registration under `[directives.<name>]`.
pub struct DirectiveCfg {
    /// Generated code; `{expression}` is replaced by the directive argument.
    pub compiles_to: String,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct WarningsCfg {
    #[serde(default)]
    pub disable: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `bladeaudit.toml|yaml`.
pub struct AuditConfig {
    pub paths: Option<Vec<String>>,
    pub extensions: Option<Vec<String>>,
    pub host_version: Option<String>,
    pub output: Option<String>,
    #[serde(default)]
    pub namespaces: HashMap<String, Vec<String>>, // [namespaces] mail = ["vendor/mail"]
    #[serde(default)]
    pub directives: HashMap<String, DirectiveCfg>,
    #[serde(default)]
    pub warnings: Option<WarningsCfg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSource {
    Cli,
    Config,
    ComposerLock,
    Default,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub root: PathBuf,
    pub config_found: bool,
    pub paths: Vec<PathBuf>,
    pub extensions: Vec<String>,
    pub host_version: HostVersion,
    pub version_source: VersionSource,
    pub output: String,
    pub namespaces: HashMap<String, Vec<PathBuf>>,
    pub directives: HashMap<String, String>,
    pub disabled: Vec<Rule>,
}

impl Effective {
    pub fn compiler(&self) -> BladeCompiler {
        BladeCompiler::new().with_directives(&self.directives)
    }

    pub fn finder(&self) -> FileViewFinder {
        let mut finder = FileViewFinder::new(self.paths.clone(), self.extensions.clone());
        for (ns, dirs) in &self.namespaces {
            finder.add_namespace(ns, dirs.clone());
        }
        finder
    }

    pub fn warning_engine(&self) -> WarningEngine {
        WarningEngine::new(self.host_version).with_disabled(self.disabled.iter().copied())
    }
}

/// Walk upward from `start` to detect the project root.
///
/// Stops when a config file, a `composer.json`, or a `.git` directory is found.
pub fn detect_project_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if CONFIG_FILES.iter().any(|f| cur.join(f).exists())
            || cur.join("composer.json").exists()
            || cur.join(".git").exists()
        {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load `AuditConfig` from `bladeaudit.toml` or `bladeaudit.yaml|yml` if present.
pub fn load_config(root: &Path) -> Result<Option<AuditConfig>> {
    for name in CONFIG_FILES {
        let path = root.join(name);
        if !path.exists() {
            continue;
        }
        let s = fs::read_to_string(&path).map_err(|source| AuditError::Io {
            path: path.clone(),
            source,
        })?;
        let cfg = if name.ends_with(".toml") {
            toml::from_str::<AuditConfig>(&s).map_err(|e| AuditError::Config(format!("{name}: {e}")))?
        } else {
            serde_yaml::from_str::<AuditConfig>(&s)
                .map_err(|e| AuditError::Config(format!("{name}: {e}")))?
        };
        return Ok(Some(cfg));
    }
    Ok(None)
}

/// Read the installed framework version from `composer.lock`.
pub fn detect_host_version(root: &Path) -> Option<HostVersion> {
    let s = fs::read_to_string(root.join("composer.lock")).ok()?;
    let lock: Json = serde_json::from_str(&s).ok()?;
    let version = lock
        .get("packages")?
        .as_array()?
        .iter()
        .find(|p| p.get("name").and_then(Json::as_str) == Some(FRAMEWORK_PACKAGE))?
        .get("version")?
        .as_str()?;
    match version.parse() {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("Ignoring framework version from composer.lock: {}", e);
            None
        }
    }
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(
    cli_root: Option<&str>,
    cli_host_version: Option<&str>,
    cli_output: Option<&str>,
) -> Result<Effective> {
    let start = PathBuf::from(cli_root.unwrap_or("."));
    let root = detect_project_root(&start);
    let loaded = load_config(&root)?;
    let config_found = loaded.is_some();
    let cfg = loaded.unwrap_or_default();

    let paths = cfg
        .paths
        .unwrap_or_else(|| vec!["resources/views".to_string()])
        .into_iter()
        .map(|p| root.join(p))
        .collect();
    let extensions = cfg.extensions.unwrap_or_else(|| {
        ["blade.php", "php", "css", "html"]
            .into_iter()
            .map(String::from)
            .collect()
    });

    let (host_version, version_source) = match (cli_host_version, cfg.host_version.as_deref()) {
        (Some(v), _) => (v.parse()?, VersionSource::Cli),
        (None, Some(v)) => (v.parse()?, VersionSource::Config),
        (None, None) => match detect_host_version(&root) {
            Some(v) => (v, VersionSource::ComposerLock),
            None => (HostVersion::default(), VersionSource::Default),
        },
    };

    let output = cli_output
        .map(|s| s.to_string())
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string());
    if output != "human" && output != "json" {
        return Err(AuditError::Config(format!(
            "unknown output mode '{output}', expected human|json"
        )));
    }

    let namespaces = cfg
        .namespaces
        .into_iter()
        .map(|(ns, dirs)| (ns, dirs.into_iter().map(|d| root.join(d)).collect()))
        .collect();
    let directives = cfg
        .directives
        .into_iter()
        .map(|(name, d)| (name, d.compiles_to))
        .collect();
    let disabled = cfg
        .warnings
        .unwrap_or_default()
        .disable
        .iter()
        .map(|id| {
            Rule::from_id(id).ok_or_else(|| AuditError::Config(format!("unknown warning rule '{id}'")))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Effective {
        root,
        config_found,
        paths,
        extensions,
        host_version,
        version_source,
        output,
        namespaces,
        directives,
        disabled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::DirectiveCompiler;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_detect_and_load_toml() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("bladeaudit.toml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
paths = ["views"]
host_version = "5.7.2"
output = "json"
[namespaces]
mail = ["vendor/mail/views"]
[directives.datetime]
compiles_to = "<?php echo ({expression})->format('m/d/Y'); ?>"
[warnings]
disable = ["slow-compile"]
    "#
        )
        .unwrap();

        let eff = resolve_effective(root.to_str(), None, None).unwrap();
        assert!(eff.config_found);
        assert_eq!(eff.paths, vec![root.join("views")]);
        assert_eq!(eff.host_version, HostVersion::new(5, 7, 2));
        assert_eq!(eff.version_source, VersionSource::Config);
        assert_eq!(eff.output, "json");
        assert_eq!(eff.namespaces["mail"], vec![root.join("vendor/mail/views")]);
        assert_eq!(eff.disabled, vec![Rule::SlowCompile]);
        assert_eq!(
            eff.compiler().compile("@datetime($d)").unwrap(),
            "<?php echo ($d)->format('m/d/Y'); ?>"
        );
    }

    #[test]
    fn test_load_yaml_and_defaults() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("bladeaudit.yaml"), "extensions: [\"blade.php\"]\n").unwrap();

        let eff = resolve_effective(root.to_str(), None, None).unwrap();
        assert_eq!(eff.paths, vec![root.join("resources/views")]);
        assert_eq!(eff.extensions, vec!["blade.php"]);
        assert_eq!(eff.output, "human");
        assert_eq!(eff.host_version, HostVersion::LATEST);
        assert_eq!(eff.version_source, VersionSource::Default);
    }

    #[test]
    fn test_cli_precedence_over_config_and_lock() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("bladeaudit.toml"), "host_version = \"5.8\"\noutput = \"json\"\n").unwrap();
        let eff = resolve_effective(root.to_str(), Some("5.5.0"), Some("human")).unwrap();
        assert_eq!(eff.host_version, HostVersion::new(5, 5, 0));
        assert_eq!(eff.version_source, VersionSource::Cli);
        assert_eq!(eff.output, "human");
    }

    #[test]
    fn test_host_version_from_composer_lock() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("composer.lock"),
            r#"{"packages": [{"name": "monolog/monolog", "version": "1.24.0"},
                              {"name": "laravel/framework", "version": "v5.8.38"}]}"#,
        )
        .unwrap();
        fs::write(root.join("composer.json"), "{}").unwrap();

        let eff = resolve_effective(root.to_str(), None, None).unwrap();
        assert!(!eff.config_found);
        assert_eq!(eff.host_version, HostVersion::new(5, 8, 38));
        assert_eq!(eff.version_source, VersionSource::ComposerLock);
    }

    #[test]
    fn test_invalid_settings_are_config_errors() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("bladeaudit.toml"), "[warnings]\ndisable = [\"nope\"]\n").unwrap();
        assert!(matches!(
            resolve_effective(root.to_str(), None, None),
            Err(AuditError::Config(_))
        ));
        assert!(matches!(
            resolve_effective(root.to_str(), Some("latest"), None),
            Err(AuditError::InvalidVersion(_))
        ));
        fs::write(root.join("bladeaudit.toml"), "paths = 3\n").unwrap();
        assert!(matches!(
            resolve_effective(root.to_str(), None, None),
            Err(AuditError::Config(_))
        ));
    }

    #[test]
    fn test_detect_root_walks_up_to_composer_json() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("composer.json"), "{}").unwrap();
        let nested = root.join("resources/views/admin");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(detect_project_root(&nested), root.to_path_buf());
    }
}
