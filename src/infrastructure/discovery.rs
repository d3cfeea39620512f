use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::infrastructure::error::{ImportError, ImportResult};

/// Azure resource families that can be imported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Aks,
    Vms,
    Lb,
    Lbgw,
    Storage,
    Sql,
    Mysql,
    Postgresql,
}

impl ResourceKind {
    /// Identifier used on the command line and in settings
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Aks => "aks",
            ResourceKind::Vms => "vms",
            ResourceKind::Lb => "lb",
            ResourceKind::Lbgw => "lbgw",
            ResourceKind::Storage => "storage",
            ResourceKind::Sql => "sql",
            ResourceKind::Mysql => "mysql",
            ResourceKind::Postgresql => "postgresql",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            ResourceKind::Aks => "AKS cluster",
            ResourceKind::Vms => "virtual machine",
            ResourceKind::Lb => "load balancer",
            ResourceKind::Lbgw => "application gateway",
            ResourceKind::Storage => "storage account",
            ResourceKind::Sql => "SQL server",
            ResourceKind::Mysql => "MySQL server",
            ResourceKind::Postgresql => "PostgreSQL server",
        }
    }

    /// Template used to render the import blocks for this kind
    pub fn template_name(&self) -> &'static str {
        self.as_str()
    }

    /// Databases that belong to the server engine and are never imported
    pub fn system_databases(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::Mysql => &[
                "mysql",
                "sys",
                "performance_schema",
                "information_schema",
                "tmp",
            ],
            ResourceKind::Postgresql => &["postgres", "azure_maintenance", "azure_sys"],
            ResourceKind::Sql => &["master"],
            _ => &[],
        }
    }

    pub fn all() -> Vec<ResourceKind> {
        vec![
            ResourceKind::Aks,
            ResourceKind::Vms,
            ResourceKind::Lb,
            ResourceKind::Lbgw,
            ResourceKind::Storage,
            ResourceKind::Sql,
            ResourceKind::Mysql,
            ResourceKind::Postgresql,
        ]
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ImportError;

    fn from_str(s: &str) -> ImportResult<Self> {
        ResourceKind::all()
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ImportError::UnsupportedResourceType {
                provider: "azurerm".to_string(),
                resource_type: s.to_string(),
            })
    }
}

/// A child object imported alongside its parent (node pool, disk, probe...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedId {
    pub name: String,
    pub id: String,
}

/// Children of one kind, e.g. every node pool of a cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubResourceList {
    pub kind: String,
    pub items: Vec<NamedId>,
}

/// A resource selected for import, with everything the import templates need
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub kind: ResourceKind,
    /// Name used for file names and Terraform addresses
    pub name: String,
    /// Full Azure resource ID
    pub id: String,
    pub resource_group: String,
    pub location: Option<String>,
    pub tags: BTreeMap<String, String>,
    /// Power or server state as reported by Azure
    pub state: Option<String>,
    /// Flavor within the kind: `linux`/`windows` for VMs, `single`/`flexible` for databases
    pub variant: Option<String>,
    pub sub_resources: Vec<SubResourceList>,
}

impl ResourceDescriptor {
    pub fn new(kind: ResourceKind, name: impl Into<String>, id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            kind,
            name: name.into(),
            resource_group: resource_group_from_id(&id).unwrap_or_default(),
            id,
            location: None,
            tags: BTreeMap::new(),
            state: None,
            variant: None,
            sub_resources: Vec::new(),
        }
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Append a child, grouping it with earlier children of the same kind
    pub fn with_sub_resource(mut self, kind: &str, item: NamedId) -> Self {
        self.push_sub_resource(kind, item);
        self
    }

    pub fn push_sub_resource(&mut self, kind: &str, item: NamedId) {
        match self.sub_resources.iter_mut().find(|list| list.kind == kind) {
            Some(list) => list.items.push(item),
            None => self.sub_resources.push(SubResourceList {
                kind: kind.to_string(),
                items: vec![item],
            }),
        }
    }

    /// Children of the given kind, empty when there are none
    pub fn sub_resources_of(&self, kind: &str) -> &[NamedId] {
        self.sub_resources
            .iter()
            .find(|list| list.kind == kind)
            .map(|list| list.items.as_slice())
            .unwrap_or(&[])
    }

    /// File holding the import blocks for this resource
    pub fn import_file_name(&self) -> String {
        format!("import-{}.tf", self.name)
    }

    /// File terraform writes the generated configuration to
    pub fn generated_file_name(&self) -> String {
        format!("generated-plan-import-{}.tf", self.name)
    }
}

/// Source of resources to import
pub trait ResourceDiscovery: Send + Sync {
    /// Resources of `kind` that pass every selection rule
    fn discover(&self, kind: ResourceKind) -> ImportResult<Vec<ResourceDescriptor>>;
}

/// Resource group segment of an Azure resource ID
///
/// `/subscriptions/<sub>/resourceGroups/<rg>/providers/...` yields `<rg>`.
pub fn resource_group_from_id(id: &str) -> Option<String> {
    id.split('/')
        .nth(4)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Replace characters that are not allowed in file names
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            other => other,
        })
        .collect()
}

/// Sanitize a string to be a valid Terraform resource name
pub fn sanitize_tf_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    let sanitized = sanitized.trim_matches('_').to_string();

    match sanitized.chars().next() {
        None => "resource".to_string(),
        Some(first) if first.is_ascii_digit() => format!("r_{}", sanitized),
        Some(_) => sanitized,
    }
}
