//! Security Tool Definitions
//!
//! Immutable catalog entries and the enums used to classify them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Risk level at or above which a tool is considered high risk
pub const HIGH_RISK_THRESHOLD: u8 = 4;

/// Lowest valid risk level
pub const MIN_RISK_LEVEL: u8 = 1;

/// Highest valid risk level
pub const MAX_RISK_LEVEL: u8 = 5;

/// Error returned when a category, OS type or status string is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseKindError {
    kind: &'static str,
    value: String,
}

impl ParseKindError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Phase of a penetration test a tool belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Discovery,
    Scanning,
    Enumeration,
    VulnerabilityAssessment,
    Exploitation,
    PostExploitation,
    LateralMovement,
    EvidenceCollection,
    PaymentSystems,
    ApiSecurity,
    Blockchain,
}

impl ToolCategory {
    /// All categories in declaration order
    pub const ALL: [ToolCategory; 11] = [
        ToolCategory::Discovery,
        ToolCategory::Scanning,
        ToolCategory::Enumeration,
        ToolCategory::VulnerabilityAssessment,
        ToolCategory::Exploitation,
        ToolCategory::PostExploitation,
        ToolCategory::LateralMovement,
        ToolCategory::EvidenceCollection,
        ToolCategory::PaymentSystems,
        ToolCategory::ApiSecurity,
        ToolCategory::Blockchain,
    ];

    /// Wire name of the category
    pub fn as_str(self) -> &'static str {
        match self {
            ToolCategory::Discovery => "discovery",
            ToolCategory::Scanning => "scanning",
            ToolCategory::Enumeration => "enumeration",
            ToolCategory::VulnerabilityAssessment => "vulnerability_assessment",
            ToolCategory::Exploitation => "exploitation",
            ToolCategory::PostExploitation => "post_exploitation",
            ToolCategory::LateralMovement => "lateral_movement",
            ToolCategory::EvidenceCollection => "evidence_collection",
            ToolCategory::PaymentSystems => "payment_systems",
            ToolCategory::ApiSecurity => "api_security",
            ToolCategory::Blockchain => "blockchain",
        }
    }
}

impl fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolCategory {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        ToolCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == lower)
            .ok_or_else(|| ParseKindError::new("category", s))
    }
}

/// Platform a tool runs on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsType {
    #[default]
    Linux,
    Windows,
    CrossPlatform,
    Cloud,
}

impl OsType {
    /// All OS types in declaration order
    pub const ALL: [OsType; 4] = [
        OsType::Linux,
        OsType::Windows,
        OsType::CrossPlatform,
        OsType::Cloud,
    ];

    /// Wire name of the OS type
    pub fn as_str(self) -> &'static str {
        match self {
            OsType::Linux => "linux",
            OsType::Windows => "windows",
            OsType::CrossPlatform => "cross_platform",
            OsType::Cloud => "cloud",
        }
    }

    /// Whether a tool declared for `self` can be used on `requested`.
    ///
    /// Cross-platform tools match every request.
    pub fn matches(self, requested: OsType) -> bool {
        self == requested || self == OsType::CrossPlatform
    }
}

impl fmt::Display for OsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OsType {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        OsType::ALL
            .into_iter()
            .find(|o| o.as_str() == lower)
            .ok_or_else(|| ParseKindError::new("os type", s))
    }
}

/// Installation/readiness state of a tool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Configured,
    #[default]
    Pending,
    Testing,
    Ready,
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ToolStatus::Configured => "configured",
            ToolStatus::Pending => "pending",
            ToolStatus::Testing => "testing",
            ToolStatus::Ready => "ready",
        };
        f.write_str(s)
    }
}

/// A single catalog entry describing how to invoke an external security tool
///
/// Entries are loaded once and never mutated. The `parameters` map holds
/// declared defaults for template placeholders; whether they are applied at
/// execution time is decided by the executor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityTool {
    /// Display name (e.g. "Nmap")
    pub name: String,

    /// Category the tool is filed under
    pub category: ToolCategory,

    /// One-line description
    #[serde(default)]
    pub description: String,

    /// Pinned tool version, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Install path, if not on `PATH`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Platform the tool targets
    #[serde(default)]
    pub os_type: OsType,

    /// Readiness state
    #[serde(default)]
    pub status: ToolStatus,

    /// Command line with `{placeholder}` tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_template: Option<String>,

    /// Declared placeholder defaults
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,

    /// Other tools or packages this tool needs
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Format the tool emits (text, json, xml, ...)
    #[serde(default = "default_output_format")]
    pub output_format: String,

    /// Execution deadline in seconds; 0 marks a long-running daemon tool
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Whether a privileged role must sign off before running
    #[serde(default)]
    pub requires_approval: bool,

    /// 1 (benign) to 5 (destructive)
    #[serde(default = "default_risk_level")]
    pub risk_level: u8,
}

fn default_output_format() -> String {
    "text".to_string()
}

fn default_timeout_seconds() -> u64 {
    300
}

fn default_risk_level() -> u8 {
    MIN_RISK_LEVEL
}

impl SecurityTool {
    /// Create a tool with the given template and catalog defaults for everything else
    pub fn new(
        name: impl Into<String>,
        category: ToolCategory,
        command_template: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            description: String::new(),
            version: None,
            path: None,
            os_type: OsType::default(),
            status: ToolStatus::default(),
            command_template: Some(command_template.into()),
            parameters: BTreeMap::new(),
            dependencies: Vec::new(),
            output_format: default_output_format(),
            timeout_seconds: default_timeout_seconds(),
            requires_approval: false,
            risk_level: default_risk_level(),
        }
    }

    /// Set the OS type
    pub fn with_os_type(mut self, os_type: OsType) -> Self {
        self.os_type = os_type;
        self
    }

    /// Set the timeout in seconds
    pub fn with_timeout_seconds(mut self, secs: u64) -> Self {
        self.timeout_seconds = secs;
        self
    }

    /// Set the risk level
    pub fn with_risk_level(mut self, level: u8) -> Self {
        self.risk_level = level;
        self
    }

    /// Mark the tool as requiring approval
    pub fn with_approval(mut self, required: bool) -> Self {
        self.requires_approval = required;
        self
    }

    /// Add a declared parameter default
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Risk level 4 or 5
    pub fn is_high_risk(&self) -> bool {
        self.risk_level >= HIGH_RISK_THRESHOLD
    }

    /// Long-running tool with no configured deadline
    pub fn is_daemon(&self) -> bool {
        self.timeout_seconds == 0
    }

    /// Template, treating an empty string the same as a missing one
    pub fn template(&self) -> Option<&str> {
        self.command_template
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }
}
