//! Execution Policy
//!
//! Role-based gate applied by callers before handing a tool to the executor.
//! The executor itself never checks `requires_approval` or `risk_level`.
//!
//! Rules:
//! - A tool with `requires_approval` may only be run by `admin` or `lead`.
//! - A tool with `risk_level >= 4` needs a role holding `workflows:approve`.

use crate::catalog::SecurityTool;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Permission needed to run high-risk tools
pub const APPROVE_PERMISSION: &str = "workflows:approve";

/// Caller role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Lead,
    Senior,
    Tester,
    Analyst,
    Viewer,
    Api,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Admin,
        Role::Lead,
        Role::Senior,
        Role::Tester,
        Role::Analyst,
        Role::Viewer,
        Role::Api,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Lead => "lead",
            Role::Senior => "senior",
            Role::Tester => "tester",
            Role::Analyst => "analyst",
            Role::Viewer => "viewer",
            Role::Api => "api",
        }
    }

    /// Permissions granted to this role; `*` grants everything
    pub fn permissions(self) -> &'static [&'static str] {
        match self {
            Role::Admin => &["*"],
            Role::Lead => &[
                "engagements:create",
                "engagements:read",
                "engagements:update",
                "engagements:delete",
                "targets:create",
                "targets:read",
                "targets:update",
                "targets:delete",
                "workflows:execute",
                "workflows:approve",
                "reports:create",
                "reports:read",
                "reports:export",
            ],
            Role::Senior => &[
                "engagements:read",
                "targets:create",
                "targets:read",
                "targets:update",
                "workflows:execute",
                "workflows:approve",
                "reports:create",
                "reports:read",
                "reports:export",
            ],
            Role::Tester => &[
                "engagements:read",
                "targets:read",
                "workflows:execute",
                "reports:read",
            ],
            Role::Analyst => &[
                "engagements:read",
                "reports:create",
                "reports:read",
                "reports:export",
            ],
            Role::Viewer => &["engagements:read", "reports:read"],
            Role::Api => &[
                "engagements:read",
                "targets:read",
                "workflows:execute",
                "reports:read",
            ],
        }
    }

    /// Check whether this role holds `permission`
    pub fn has_permission(self, permission: &str) -> bool {
        let granted = self.permissions();
        granted.contains(&"*") || granted.contains(&permission)
    }

    /// Whether this role may run tools flagged `requires_approval`
    pub fn can_run_approval_tools(self) -> bool {
        matches!(self, Role::Admin | Role::Lead)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PolicyError::UnknownRole(s.to_string()))
    }
}

/// Reasons a run is refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("Tool '{tool}' requires approval before execution. Contact an admin or lead.")]
    ApprovalRequired { tool: String },

    #[error("Tool '{tool}' has high risk level ({risk_level}). Approver role required.")]
    HighRisk { tool: String, risk_level: u8 },

    #[error("Unknown role '{0}'")]
    UnknownRole(String),
}

/// Caller-side authorization for tool runs
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionPolicy;

impl ExecutionPolicy {
    pub fn new() -> Self {
        Self
    }

    /// Decide whether `role` may run `tool`
    ///
    /// The approval check runs first, so a tool that both requires approval
    /// and is high risk reports `ApprovalRequired` to non-leads.
    pub fn authorize(&self, role: Role, key: &str, tool: &SecurityTool) -> Result<(), PolicyError> {
        if tool.requires_approval && !role.can_run_approval_tools() {
            tracing::warn!(tool = key, role = %role, "Execution refused: approval required");
            return Err(PolicyError::ApprovalRequired {
                tool: key.to_string(),
            });
        }

        if tool.is_high_risk() && !role.has_permission(APPROVE_PERMISSION) {
            tracing::warn!(
                tool = key,
                role = %role,
                risk_level = tool.risk_level,
                "Execution refused: high risk"
            );
            return Err(PolicyError::HighRisk {
                tool: key.to_string(),
                risk_level: tool.risk_level,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, ToolCategory, ToolRepository};

    fn tool(risk: u8, approval: bool) -> SecurityTool {
        SecurityTool::new("T", ToolCategory::Exploitation, "t {target}")
            .with_risk_level(risk)
            .with_approval(approval)
    }

    #[test]
    fn test_admin_has_every_permission() {
        assert!(Role::Admin.has_permission("workflows:approve"));
        assert!(Role::Admin.has_permission("anything:else"));
    }

    #[test]
    fn test_only_lead_and_senior_approve() {
        let approvers: Vec<Role> = Role::ALL
            .into_iter()
            .filter(|r| r.has_permission(APPROVE_PERMISSION))
            .collect();
        assert_eq!(approvers, vec![Role::Admin, Role::Lead, Role::Senior]);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("LEAD".parse::<Role>().unwrap(), Role::Lead);
        assert_eq!(" api ".parse::<Role>().unwrap(), Role::Api);
        assert!(matches!(
            "root".parse::<Role>(),
            Err(PolicyError::UnknownRole(_))
        ));
    }

    #[test]
    fn test_low_risk_tool_allowed_for_everyone() {
        let policy = ExecutionPolicy::new();
        for role in Role::ALL {
            assert!(policy.authorize(role, "t", &tool(1, false)).is_ok());
        }
    }

    #[test]
    fn test_approval_required_tool() {
        let policy = ExecutionPolicy::new();
        let t = tool(2, true);

        assert!(policy.authorize(Role::Admin, "t", &t).is_ok());
        assert!(policy.authorize(Role::Lead, "t", &t).is_ok());
        // Senior can approve workflows but not run approval-gated tools
        assert_eq!(
            policy.authorize(Role::Senior, "t", &t),
            Err(PolicyError::ApprovalRequired {
                tool: "t".to_string()
            })
        );
    }

    #[test]
    fn test_high_risk_tool() {
        let policy = ExecutionPolicy::new();
        let t = tool(4, false);

        assert!(policy.authorize(Role::Senior, "t", &t).is_ok());
        let err = policy.authorize(Role::Tester, "t", &t).unwrap_err();
        assert_eq!(
            err,
            PolicyError::HighRisk {
                tool: "t".to_string(),
                risk_level: 4
            }
        );
        assert!(err.to_string().contains("high risk level (4)"));
    }

    #[test]
    fn test_builtin_metasploit_needs_lead() {
        let catalog = Catalog::builtin().unwrap();
        let msf = catalog.get("metasploit").unwrap();
        assert!(msf.requires_approval);

        let policy = ExecutionPolicy::new();
        assert!(policy.authorize(Role::Lead, "metasploit", msf).is_ok());
        assert!(policy.authorize(Role::Tester, "metasploit", msf).is_err());
    }
}
