//! Cleanup rule table
//!
//! The rule table is the whole behavioral surface of the cleanup engine:
//! global noise patterns with their exceptions, whole-file multiline patterns,
//! and an ordered list of rules per resource type. It is written in YAML
//! ([`RuleTable`]) and compiled once into [`CompiledRules`] before any file is
//! touched, so a malformed pattern fails the run up front.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::{CleanupError, CleanupResult};
use super::pattern::{compile_multiline, Pattern, PatternSpec};
use crate::traits::FileSystem;

/// Rule table shipped inside the binary
const BUILTIN_RULES: &str = include_str!("../../rules/azurerm.yaml");

/// Rule table as written in YAML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    #[serde(default)]
    pub global: GlobalRuleSpec,
    #[serde(default)]
    pub multiline: Vec<String>,
    #[serde(default)]
    pub resources: BTreeMap<String, Vec<RuleSpec>>,
}

/// Resource-type-agnostic noise patterns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalRuleSpec {
    #[serde(default)]
    pub patterns: Vec<PatternSpec>,
    #[serde(default)]
    pub exceptions: Vec<ExceptionSpec>,
}

/// A noise-matching line is kept when every pattern of an exception matches it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionSpec {
    pub all_of: Vec<PatternSpec>,
}

/// One rule attached to a resource type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RuleSpec {
    /// Drop matching lines
    Delete { pattern: PatternSpec },
    /// Replace matching lines with a fixed line
    Substitute {
        pattern: PatternSpec,
        replacement: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        warning: Option<String>,
    },
    /// Never delete matching lines
    Keep { pattern: PatternSpec },
}

impl RuleTable {
    /// The built-in azurerm rule table
    pub fn builtin() -> CleanupResult<Self> {
        Self::from_yaml(BUILTIN_RULES)
    }

    pub fn from_yaml(source: &str) -> CleanupResult<Self> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// Load a rule table file through the filesystem abstraction
    pub fn load(fs: &dyn FileSystem, path: &Path) -> CleanupResult<Self> {
        let source = fs
            .read_to_string(path)
            .map_err(|e| CleanupError::FileSystem {
                path: path.to_path_buf(),
                message: format!("{:#}", e),
            })?;

        Self::from_yaml(&source)
    }

    pub fn to_yaml(&self) -> CleanupResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Compile every pattern, failing on the first malformed one
    pub fn compile(&self) -> CleanupResult<CompiledRules> {
        CompiledRules::compile(self)
    }
}

/// What a compiled resource rule does to a matching line
#[derive(Debug, Clone, PartialEq)]
pub enum RuleAction {
    Delete,
    Substitute {
        replacement: String,
        warning: Option<String>,
    },
    Keep,
}

#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub action: RuleAction,
    pub pattern: Pattern,
}

impl CompiledRule {
    fn compile(spec: &RuleSpec) -> CleanupResult<Self> {
        let (action, pattern) = match spec {
            RuleSpec::Delete { pattern } => (RuleAction::Delete, pattern),
            RuleSpec::Substitute {
                pattern,
                replacement,
                warning,
            } => (
                RuleAction::Substitute {
                    replacement: replacement.clone(),
                    warning: warning.clone(),
                },
                pattern,
            ),
            RuleSpec::Keep { pattern } => (RuleAction::Keep, pattern),
        };

        Ok(Self {
            action,
            pattern: pattern.compile()?,
        })
    }
}

/// Compiled global noise patterns and their exceptions
#[derive(Debug, Clone, Default)]
pub struct GlobalRules {
    pub patterns: Vec<Pattern>,
    pub exceptions: Vec<Vec<Pattern>>,
}

impl GlobalRules {
    pub fn is_noise(&self, line: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(line))
    }

    pub fn is_exception(&self, line: &str) -> bool {
        self.exceptions
            .iter()
            .any(|all_of| !all_of.is_empty() && all_of.iter().all(|p| p.is_match(line)))
    }
}

/// Rule table ready to be handed to the cleaner
#[derive(Debug, Clone, Default)]
pub struct CompiledRules {
    pub global: GlobalRules,
    pub multiline: Vec<Regex>,
    resources: HashMap<String, Vec<CompiledRule>>,
}

impl CompiledRules {
    pub fn compile(table: &RuleTable) -> CleanupResult<Self> {
        let patterns = table
            .global
            .patterns
            .iter()
            .map(PatternSpec::compile)
            .collect::<CleanupResult<Vec<_>>>()?;

        let exceptions = table
            .global
            .exceptions
            .iter()
            .map(|exception| {
                exception
                    .all_of
                    .iter()
                    .map(PatternSpec::compile)
                    .collect::<CleanupResult<Vec<_>>>()
            })
            .collect::<CleanupResult<Vec<_>>>()?;

        let multiline = table
            .multiline
            .iter()
            .map(|expr| compile_multiline(expr))
            .collect::<CleanupResult<Vec<_>>>()?;

        let mut resources = HashMap::new();

        for (resource_type, specs) in &table.resources {
            let rules = specs
                .iter()
                .map(CompiledRule::compile)
                .collect::<CleanupResult<Vec<_>>>()?;
            resources.insert(resource_type.clone(), rules);
        }

        Ok(Self {
            global: GlobalRules {
                patterns,
                exceptions,
            },
            multiline,
            resources,
        })
    }

    /// Compiled built-in table
    pub fn builtin() -> CleanupResult<Self> {
        RuleTable::builtin()?.compile()
    }

    /// Rules for a resource type; unknown types have none
    pub fn for_type(&self, resource_type: &str) -> &[CompiledRule] {
        self.resources
            .get(resource_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn resource_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.resources.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}
