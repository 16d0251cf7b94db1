//! Security Tool Catalog
//!
//! The catalog is the static registry of known security tools. It is loaded
//! once at process start (from the embedded default table or a TOML file)
//! and is read-only afterwards.
//!
//! # Format
//!
//! ```toml
//! [tools."nmap"]
//! name = "Nmap"
//! category = "discovery"
//! command_template = "nmap -sV {target}"
//! timeout_seconds = 600
//! risk_level = 2
//! ```
//!
//! Consumers depend on the [`ToolRepository`] trait rather than on
//! [`Catalog`] directly, so tests can substitute their own tables.

mod tool;

pub use tool::{
    OsType, ParseKindError, SecurityTool, ToolCategory, ToolStatus, HIGH_RISK_THRESHOLD,
    MAX_RISK_LEVEL, MIN_RISK_LEVEL,
};

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Default catalog compiled into the binary
const BUILTIN_CATALOG: &str = include_str!("../../catalog/tools.toml");

/// Errors raised while loading a catalog
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("tool '{key}' has risk level {level}, expected 1-5")]
    InvalidRiskLevel { key: String, level: u8 },

    #[error("tool '{0}' has an empty name")]
    EmptyName(String),

    #[error("tool key '{0}' is defined more than once")]
    DuplicateKey(String),
}

/// Read-only access to tool definitions
pub trait ToolRepository: Send + Sync {
    /// Look up a tool by key (case-insensitive)
    fn get(&self, key: &str) -> Option<&SecurityTool>;

    /// Iterate all tools as `(key, tool)` pairs, ordered by key
    fn tools(&self) -> Box<dyn Iterator<Item = (&str, &SecurityTool)> + '_>;

    /// Number of tools
    fn len(&self) -> usize;

    /// Whether the repository holds no tools
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    tools: BTreeMap<String, SecurityTool>,
}

/// Immutable tool catalog keyed by lower-cased tool key
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tools: BTreeMap<String, SecurityTool>,
}

impl Catalog {
    /// Load the catalog embedded at build time
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    /// Parse a catalog from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(content)?;
        Self::from_tools(file.tools)
    }

    /// Load a catalog from a TOML file
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let catalog = Self::from_toml_str(&content)?;
        tracing::info!(tools = catalog.len(), "Loaded tool catalog from {:?}", path);
        Ok(catalog)
    }

    /// Build a catalog from `(key, tool)` pairs
    ///
    /// Keys are lower-cased; two keys that collide after lower-casing are
    /// rejected. Every entry is validated.
    pub fn from_tools<I, K>(tools: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (K, SecurityTool)>,
        K: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (key, tool) in tools {
            let key = key.into().to_lowercase();
            if map.contains_key(&key) {
                return Err(CatalogError::DuplicateKey(key));
            }
            map.insert(key, tool);
        }

        let catalog = Self { tools: map };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check every entry for a name and a risk level in range
    pub fn validate(&self) -> Result<(), CatalogError> {
        for (key, tool) in &self.tools {
            if tool.name.trim().is_empty() {
                return Err(CatalogError::EmptyName(key.clone()));
            }
            if !(MIN_RISK_LEVEL..=MAX_RISK_LEVEL).contains(&tool.risk_level) {
                return Err(CatalogError::InvalidRiskLevel {
                    key: key.clone(),
                    level: tool.risk_level,
                });
            }
        }
        Ok(())
    }

    /// All keys in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }
}

impl ToolRepository for Catalog {
    fn get(&self, key: &str) -> Option<&SecurityTool> {
        self.tools.get(&key.to_lowercase())
    }

    fn tools(&self) -> Box<dyn Iterator<Item = (&str, &SecurityTool)> + '_> {
        Box::new(self.tools.iter().map(|(k, v)| (k.as_str(), v)))
    }

    fn len(&self) -> usize {
        self.tools.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.len(), 199);
        assert!(catalog.get("nmap").is_some());
        assert!(catalog.get("NMAP").is_some());
    }

    #[test]
    fn test_builtin_catalog_category_counts() {
        let catalog = Catalog::builtin().unwrap();
        let count = |c: ToolCategory| catalog.tools().filter(|(_, t)| t.category == c).count();

        assert_eq!(count(ToolCategory::Discovery), 17);
        assert_eq!(count(ToolCategory::Scanning), 14);
        assert_eq!(count(ToolCategory::Enumeration), 35);
        assert_eq!(count(ToolCategory::VulnerabilityAssessment), 22);
        assert_eq!(count(ToolCategory::Exploitation), 23);
        assert_eq!(count(ToolCategory::PostExploitation), 30);
        assert_eq!(count(ToolCategory::LateralMovement), 22);
        assert_eq!(count(ToolCategory::EvidenceCollection), 12);
        assert_eq!(count(ToolCategory::PaymentSystems), 10);
        assert_eq!(count(ToolCategory::ApiSecurity), 8);
        assert_eq!(count(ToolCategory::Blockchain), 6);
    }

    #[test]
    fn test_builtin_catalog_every_tool_has_template() {
        let catalog = Catalog::builtin().unwrap();
        for (key, tool) in catalog.tools() {
            assert!(tool.template().is_some(), "tool {} has no template", key);
        }
    }

    #[test]
    fn test_from_toml_str() {
        let catalog = Catalog::from_toml_str(
            r#"
[tools.curl_test]
name = "curl"
category = "api_security"
command_template = "curl -X {method} {url}"
timeout_seconds = 30
"#,
        )
        .unwrap();

        let tool = catalog.get("curl_test").unwrap();
        assert_eq!(tool.name, "curl");
        assert_eq!(tool.category, ToolCategory::ApiSecurity);
        assert_eq!(tool.timeout_seconds, 30);
    }

    #[test]
    fn test_keys_are_lowercased() {
        let catalog = Catalog::from_toml_str(
            r#"
[tools.MixedCase]
name = "Mixed"
category = "scanning"
"#,
        )
        .unwrap();

        assert_eq!(catalog.keys().collect::<Vec<_>>(), vec!["mixedcase"]);
        assert!(catalog.get("MIXEDCASE").is_some());
    }

    #[test]
    fn test_duplicate_keys_after_lowercasing_rejected() {
        let tools = vec![
            ("Nmap", SecurityTool::new("Nmap", ToolCategory::Discovery, "nmap")),
            ("nmap", SecurityTool::new("Nmap", ToolCategory::Discovery, "nmap")),
        ];
        let err = Catalog::from_tools(tools).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateKey(k) if k == "nmap"));
    }

    #[test]
    fn test_invalid_risk_level_rejected() {
        let result = Catalog::from_toml_str(
            r#"
[tools.bad]
name = "Bad"
category = "exploitation"
risk_level = 9
"#,
        );
        assert!(matches!(
            result,
            Err(CatalogError::InvalidRiskLevel { level: 9, .. })
        ));

        let zero = Catalog::from_tools(vec![(
            "zero",
            SecurityTool::new("Zero", ToolCategory::Scanning, "z").with_risk_level(0),
        )]);
        assert!(zero.is_err());
    }

    #[test]
    fn test_empty_name_rejected() {
        let result = Catalog::from_tools(vec![(
            "blank",
            SecurityTool::new("  ", ToolCategory::Scanning, "x"),
        )]);
        assert!(matches!(result, Err(CatalogError::EmptyName(_))));
    }

    #[test]
    fn test_unknown_category_is_parse_error() {
        let result = Catalog::from_toml_str(
            r#"
[tools.x]
name = "X"
category = "wifi"
"#,
        );
        assert!(matches!(result, Err(CatalogError::Parse(_))));
    }

    #[test]
    fn test_load_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[tools.echo]
name = "Echo"
category = "discovery"
command_template = "echo {{message}}"
"#
        )
        .unwrap();

        let catalog = Catalog::load_from_path(file.path()).unwrap();
        assert_eq!(
            catalog.get("echo").unwrap().command_template.as_deref(),
            Some("echo {message}")
        );
    }

    #[test]
    fn test_load_from_missing_path() {
        let result = Catalog::load_from_path("/nonexistent/anptop/catalog.toml");
        assert!(matches!(result, Err(CatalogError::Io { .. })));
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = Catalog::from_toml_str("").unwrap();
        assert!(catalog.is_empty());
    }
}
