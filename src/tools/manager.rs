//! Tool Manager
//!
//! Indexes the catalog and materializes commands from templates. Every
//! operation here is pure: lookups miss with `None`, command building misses
//! with an empty string, and nothing is mutated.

use super::template::{CommandTemplate, PreparedCommand, ToolParameters};
use crate::catalog::{Catalog, CatalogError, OsType, SecurityTool, ToolCategory, ToolRepository, ToolStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Aggregate counts over the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSummary {
    pub total_tools: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_os: BTreeMap<String, usize>,
    pub high_risk_count: usize,
    pub approval_required_count: usize,
}

/// Listing row for one tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub key: String,
    pub name: String,
    pub category: ToolCategory,
    pub os_type: OsType,
    pub status: ToolStatus,
    pub risk_level: u8,
    pub requires_approval: bool,
    pub description: String,
}

impl ToolInfo {
    fn from_tool(key: &str, tool: &SecurityTool) -> Self {
        Self {
            key: key.to_string(),
            name: tool.name.clone(),
            category: tool.category,
            os_type: tool.os_type,
            status: tool.status,
            risk_level: tool.risk_level,
            requires_approval: tool.requires_approval,
            description: tool.description.clone(),
        }
    }
}

/// Resolves tool metadata and builds commands
#[derive(Clone)]
pub struct ToolManager {
    repository: Arc<dyn ToolRepository>,
}

impl std::fmt::Debug for ToolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolManager")
            .field("tools", &self.repository.len())
            .finish()
    }
}

impl ToolManager {
    /// Create a manager over any tool repository
    pub fn new(repository: Arc<dyn ToolRepository>) -> Self {
        Self { repository }
    }

    /// Create a manager over the embedded catalog
    pub fn builtin() -> Result<Self, CatalogError> {
        Ok(Self::new(Arc::new(Catalog::builtin()?)))
    }

    /// Underlying repository
    pub fn repository(&self) -> &Arc<dyn ToolRepository> {
        &self.repository
    }

    /// Look up a tool by key, ignoring case
    pub fn get_tool(&self, key: &str) -> Option<&SecurityTool> {
        self.repository.get(key)
    }

    /// Tools filed under exactly `category`
    pub fn get_tools_by_category(&self, category: ToolCategory) -> BTreeMap<String, &SecurityTool> {
        self.filter(|tool| tool.category == category)
    }

    /// Tools for `os_type`, including cross-platform tools
    pub fn get_tools_by_os(&self, os_type: OsType) -> BTreeMap<String, &SecurityTool> {
        self.filter(|tool| tool.os_type.matches(os_type))
    }

    /// Tools with risk level 4 or higher
    pub fn get_high_risk_tools(&self) -> BTreeMap<String, &SecurityTool> {
        self.filter(SecurityTool::is_high_risk)
    }

    /// Tools that need sign-off before running
    pub fn get_approval_required_tools(&self) -> BTreeMap<String, &SecurityTool> {
        self.filter(|tool| tool.requires_approval)
    }

    /// All tool keys, sorted
    pub fn list_available_tools(&self) -> Vec<String> {
        self.repository.tools().map(|(k, _)| k.to_string()).collect()
    }

    /// Listing rows for every tool, sorted by key
    pub fn list_tool_infos(&self) -> Vec<ToolInfo> {
        self.repository
            .tools()
            .map(|(k, t)| ToolInfo::from_tool(k, t))
            .collect()
    }

    /// Substitute caller parameters into a tool's template
    ///
    /// Returns an empty string when the tool is unknown or has no template;
    /// callers must treat that as "cannot build". Only `parameters` are used:
    /// the tool's declared defaults are not merged, so any placeholder the
    /// caller leaves out remains as literal `{name}` text.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use anptop_engine::catalog::{Catalog, SecurityTool, ToolCategory};
    /// use anptop_engine::tools::{ToolManager, ToolParameters};
    ///
    /// let catalog = Catalog::from_tools(vec![(
    ///     "curl_test",
    ///     SecurityTool::new("curl", ToolCategory::ApiSecurity, "curl -X {method} {url}"),
    /// )]).unwrap();
    /// let manager = ToolManager::new(Arc::new(catalog));
    ///
    /// let mut params = ToolParameters::new();
    /// params.insert("url".into(), "http://example.test".into());
    /// assert_eq!(manager.build_command("curl_test", &params), "curl -X {method} http://example.test");
    /// ```
    pub fn build_command(&self, key: &str, parameters: &ToolParameters) -> String {
        match self.template_for(key) {
            Some(template) => template.render(parameters),
            None => String::new(),
        }
    }

    /// Build the spawn plan the executor runs
    ///
    /// With `merge_defaults`, the tool's declared parameters fill any
    /// placeholder the caller did not supply; caller values always win.
    pub fn plan_command(
        &self,
        key: &str,
        parameters: &ToolParameters,
        merge_defaults: bool,
    ) -> Option<PreparedCommand> {
        let tool = self.get_tool(key)?;
        let template = CommandTemplate::parse(tool.template()?);

        if merge_defaults {
            let mut merged = tool.parameters.clone();
            merged.extend(parameters.iter().map(|(k, v)| (k.clone(), v.clone())));
            Some(template.prepare(&merged))
        } else {
            Some(template.prepare(parameters))
        }
    }

    /// Placeholders of `key`'s template not covered by `parameters`
    pub fn unresolved_placeholders(&self, key: &str, parameters: &ToolParameters) -> Vec<String> {
        self.template_for(key)
            .map(|t| t.unresolved(parameters).into_iter().map(String::from).collect())
            .unwrap_or_default()
    }

    /// Aggregate counts across the catalog
    pub fn get_tool_summary(&self) -> ToolSummary {
        let by_category = ToolCategory::ALL
            .into_iter()
            .map(|c| (c.to_string(), self.get_tools_by_category(c).len()))
            .collect();

        let by_os = OsType::ALL
            .into_iter()
            .map(|o| (o.to_string(), self.get_tools_by_os(o).len()))
            .collect();

        ToolSummary {
            total_tools: self.repository.len(),
            by_category,
            by_os,
            high_risk_count: self.get_high_risk_tools().len(),
            approval_required_count: self.get_approval_required_tools().len(),
        }
    }

    fn template_for(&self, key: &str) -> Option<CommandTemplate> {
        self.get_tool(key)?.template().map(CommandTemplate::parse)
    }

    fn filter<F>(&self, predicate: F) -> BTreeMap<String, &SecurityTool>
    where
        F: Fn(&SecurityTool) -> bool,
    {
        self.repository
            .tools()
            .filter(|(_, tool)| predicate(tool))
            .map(|(key, tool)| (key.to_string(), tool))
            .collect()
    }
}
