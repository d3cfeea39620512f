use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use crate::infrastructure::discovery::{
    NamedId, ResourceDescriptor, ResourceDiscovery, ResourceKind, resource_group_from_id,
    sanitize_file_name,
};
use crate::infrastructure::error::{ImportError, ImportResult};
use crate::traits::FileSystem;

/// Tag that marks a resource as already managed by Terraform
const IMPORTED_TAG: &str = "TF_IMPORTED";

/// States of resources that are switched off and not worth importing
const INACTIVE_STATES: &[&str] = &["stopped", "deallocated", "deallocating", "stopping"];

/// Inventory export listing the resources of a subscription
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub resources: Vec<InventoryEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InventoryEntry {
    pub kind: ResourceKind,
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub resource_group: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub children: Vec<InventoryChild>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InventoryChild {
    /// Child group, e.g. `node_pools`, `databases`, `probes`
    pub kind: String,
    pub name: String,
    pub id: String,
    /// Node pool mode (`System` or `User`)
    #[serde(default)]
    pub mode: Option<String>,
}

/// Discovers resources from an inventory export (JSON or YAML)
///
/// The export is typically produced with `az resource list` and enriched with
/// the children each kind imports alongside its parent. Selection follows the
/// same rules for every source:
/// - resources tagged `TF_IMPORTED=true` are already managed and skipped
/// - every tag filter must match exactly
/// - stopped or deallocated resources are skipped
/// - system node pools and engine system databases are never imported
/// - load balancers managed by a Kubernetes cluster are skipped
pub struct InventoryDiscovery {
    inventory: Inventory,
    subscription_id: String,
    tag_filters: Vec<(String, String)>,
}

impl InventoryDiscovery {
    pub fn new(inventory: Inventory, subscription_id: impl Into<String>) -> Self {
        Self {
            inventory,
            subscription_id: subscription_id.into(),
            tag_filters: Vec::new(),
        }
    }

    /// Load an inventory file, parsed as JSON when the extension is `.json`
    pub fn load(
        fs: &dyn FileSystem,
        path: &Path,
        subscription_id: impl Into<String>,
    ) -> ImportResult<Self> {
        let content = fs
            .read_to_string(path)
            .map_err(|e| ImportError::FileSystem(format!("{:#}", e)))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let inventory: Inventory = if is_json {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };

        debug!(
            path = %path.display(),
            resources = inventory.resources.len(),
            "Loaded inventory"
        );

        Ok(Self::new(inventory, subscription_id))
    }

    /// Only keep resources carrying every given tag with exactly this value
    pub fn with_tag_filters(mut self, filters: Vec<(String, String)>) -> Self {
        self.tag_filters = filters;
        self
    }

    fn in_subscription(&self, id: &str) -> bool {
        let mut segments = id.split('/').skip(1);
        match (segments.next(), segments.next()) {
            (Some(marker), Some(subscription)) if marker.eq_ignore_ascii_case("subscriptions") => {
                subscription.eq_ignore_ascii_case(&self.subscription_id)
            }
            _ => true,
        }
    }

    fn tags_match(&self, tags: &BTreeMap<String, String>) -> bool {
        if tags
            .get(IMPORTED_TAG)
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
        {
            return false;
        }

        self.tag_filters
            .iter()
            .all(|(key, value)| tags.get(key) == Some(value))
    }

    fn select(&self, entry: &InventoryEntry, kind: ResourceKind) -> Option<ResourceDescriptor> {
        if entry.kind != kind || !self.in_subscription(&entry.id) {
            return None;
        }

        if !self.tags_match(&entry.tags) {
            debug!(name = %entry.name, "Skipping resource filtered out by tags");
            return None;
        }

        if entry.state.as_deref().is_some_and(is_inactive) {
            info!(name = %entry.name, state = ?entry.state, "Skipping inactive resource");
            return None;
        }

        if kind == ResourceKind::Lb && entry.name.contains("kubernetes") {
            info!(name = %entry.name, "Skipping load balancer managed by a Kubernetes cluster");
            return None;
        }

        let name = match kind {
            ResourceKind::Vms => sanitize_file_name(&entry.name),
            _ => entry.name.clone(),
        };

        let mut descriptor = ResourceDescriptor::new(kind, name, entry.id.clone());
        if let Some(resource_group) = entry
            .resource_group
            .clone()
            .or_else(|| resource_group_from_id(&entry.id))
        {
            descriptor.resource_group = resource_group;
        }
        descriptor.location = entry.location.clone();
        descriptor.tags = entry.tags.clone();
        descriptor.state = entry.state.clone();
        descriptor.variant = entry.variant.clone();

        for child in &entry.children {
            if is_excluded_child(kind, child) {
                debug!(parent = %entry.name, child = %child.name, "Skipping system child");
                continue;
            }
            descriptor.push_sub_resource(
                &child.kind,
                NamedId {
                    name: child.name.clone(),
                    id: child.id.clone(),
                },
            );
        }

        Some(descriptor)
    }
}

impl ResourceDiscovery for InventoryDiscovery {
    fn discover(&self, kind: ResourceKind) -> ImportResult<Vec<ResourceDescriptor>> {
        let descriptors: Vec<ResourceDescriptor> = self
            .inventory
            .resources
            .iter()
            .filter_map(|entry| self.select(entry, kind))
            .collect();

        info!(
            kind = %kind,
            count = descriptors.len(),
            "Discovered resources to import"
        );

        Ok(descriptors)
    }
}

/// `VM deallocated` and `Stopped` both count as inactive
fn is_inactive(state: &str) -> bool {
    let state = state.trim().to_ascii_lowercase();
    let state = state.strip_prefix("vm ").unwrap_or(&state);
    INACTIVE_STATES.contains(&state)
}

fn is_excluded_child(kind: ResourceKind, child: &InventoryChild) -> bool {
    match kind {
        ResourceKind::Aks => child
            .mode
            .as_deref()
            .is_some_and(|mode| mode.eq_ignore_ascii_case("system")),
        ResourceKind::Sql | ResourceKind::Mysql | ResourceKind::Postgresql => {
            child.kind == "databases" && kind.system_databases().contains(&child.name.as_str())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockFileSystem;
    use std::path::PathBuf;

    const SUB: &str = "00000000-0000-0000-0000-000000000001";

    const INVENTORY: &str = r#"
resources:
  - kind: aks
    name: aks-prod
    id: /subscriptions/00000000-0000-0000-0000-000000000001/resourceGroups/rg-aks/providers/Microsoft.ContainerService/managedClusters/aks-prod
    location: westeurope
    tags:
      env: prod
    children:
      - kind: node_pools
        name: system
        id: /subscriptions/00000000-0000-0000-0000-000000000001/resourceGroups/rg-aks/providers/Microsoft.ContainerService/managedClusters/aks-prod/agentPools/system
        mode: System
      - kind: node_pools
        name: workers
        id: /subscriptions/00000000-0000-0000-0000-000000000001/resourceGroups/rg-aks/providers/Microsoft.ContainerService/managedClusters/aks-prod/agentPools/workers
        mode: User
  - kind: aks
    name: aks-done
    id: /subscriptions/00000000-0000-0000-0000-000000000001/resourceGroups/rg-aks/providers/Microsoft.ContainerService/managedClusters/aks-done
    tags:
      TF_IMPORTED: "True"
  - kind: vms
    name: "web:01"
    id: /subscriptions/00000000-0000-0000-0000-000000000001/resourceGroups/rg-vm/providers/Microsoft.Compute/virtualMachines/web01
    state: VM running
    variant: linux
  - kind: vms
    name: batch
    id: /subscriptions/00000000-0000-0000-0000-000000000001/resourceGroups/rg-vm/providers/Microsoft.Compute/virtualMachines/batch
    state: VM deallocated
  - kind: vms
    name: other-sub
    id: /subscriptions/99999999-0000-0000-0000-000000000000/resourceGroups/rg-vm/providers/Microsoft.Compute/virtualMachines/other
  - kind: lb
    name: kubernetes-internal
    id: /subscriptions/00000000-0000-0000-0000-000000000001/resourceGroups/mc-rg/providers/Microsoft.Network/loadBalancers/kubernetes-internal
  - kind: lb
    name: lb-web
    id: /subscriptions/00000000-0000-0000-0000-000000000001/resourceGroups/rg-net/providers/Microsoft.Network/loadBalancers/lb-web
  - kind: mysql
    name: mysql-orders
    id: /subscriptions/00000000-0000-0000-0000-000000000001/resourceGroups/rg-db/providers/Microsoft.DBforMySQL/flexibleServers/mysql-orders
    variant: flexible
    state: Ready
    children:
      - kind: databases
        name: orders
        id: /subscriptions/00000000-0000-0000-0000-000000000001/resourceGroups/rg-db/providers/Microsoft.DBforMySQL/flexibleServers/mysql-orders/databases/orders
      - kind: databases
        name: information_schema
        id: /subscriptions/00000000-0000-0000-0000-000000000001/resourceGroups/rg-db/providers/Microsoft.DBforMySQL/flexibleServers/mysql-orders/databases/information_schema
  - kind: sql
    name: sql-stopped
    id: /subscriptions/00000000-0000-0000-0000-000000000001/resourceGroups/rg-db/providers/Microsoft.Sql/servers/sql-stopped
    state: Stopped
"#;

    fn discovery() -> InventoryDiscovery {
        let inventory: Inventory = serde_yaml::from_str(INVENTORY).unwrap();
        InventoryDiscovery::new(inventory, SUB)
    }

    #[test]
    fn test_aks_skips_imported_clusters_and_system_pools() {
        let clusters = discovery().discover(ResourceKind::Aks).unwrap();

        assert_eq!(clusters.len(), 1);
        let cluster = &clusters[0];
        assert_eq!(cluster.name, "aks-prod");
        assert_eq!(cluster.resource_group, "rg-aks");
        assert_eq!(cluster.location.as_deref(), Some("westeurope"));
        let pools = cluster.sub_resources_of("node_pools");
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].name, "workers");
    }

    #[test]
    fn test_vms_skip_deallocated_and_foreign_subscriptions() {
        let vms = discovery().discover(ResourceKind::Vms).unwrap();

        assert_eq!(vms.len(), 1);
        assert_eq!(vms[0].name, "web_01");
        assert_eq!(vms[0].variant.as_deref(), Some("linux"));
    }

    #[test]
    fn test_lb_skips_kubernetes_managed() {
        let lbs = discovery().discover(ResourceKind::Lb).unwrap();

        let names: Vec<&str> = lbs.iter().map(|lb| lb.name.as_str()).collect();
        assert_eq!(names, vec!["lb-web"]);
    }

    #[test]
    fn test_databases_exclude_system_databases() {
        let servers = discovery().discover(ResourceKind::Mysql).unwrap();

        assert_eq!(servers.len(), 1);
        let databases = servers[0].sub_resources_of("databases");
        assert_eq!(databases.len(), 1);
        assert_eq!(databases[0].name, "orders");
    }

    #[test]
    fn test_stopped_server_is_skipped() {
        assert!(discovery().discover(ResourceKind::Sql).unwrap().is_empty());
    }

    #[test]
    fn test_tag_filters_must_all_match() {
        let matching = discovery()
            .with_tag_filters(vec![("env".to_string(), "prod".to_string())])
            .discover(ResourceKind::Aks)
            .unwrap();
        let mismatching = discovery()
            .with_tag_filters(vec![
                ("env".to_string(), "prod".to_string()),
                ("team".to_string(), "core".to_string()),
            ])
            .discover(ResourceKind::Aks)
            .unwrap();

        assert_eq!(matching.len(), 1);
        assert!(mismatching.is_empty());
    }

    #[test]
    fn test_load_json_inventory() {
        let fs = MockFileSystem::new();
        let path = PathBuf::from("/inventory/export.json");
        fs.write(
            &path,
            r#"{"resources": [{"kind": "storage", "name": "stlogs", "id": "/subscriptions/00000000-0000-0000-0000-000000000001/resourceGroups/rg-st/providers/Microsoft.Storage/storageAccounts/stlogs"}]}"#,
        )
        .unwrap();

        let discovery = InventoryDiscovery::load(&fs, &path, SUB).unwrap();
        let accounts = discovery.discover(ResourceKind::Storage).unwrap();

        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].resource_group, "rg-st");
    }

    #[test]
    fn test_load_rejects_malformed_inventory() {
        let fs = MockFileSystem::new();
        let path = PathBuf::from("/inventory/export.yaml");
        fs.write(&path, "resources:\n  - kind: redis\n    name: x\n    id: y\n")
            .unwrap();

        let result = InventoryDiscovery::load(&fs, &path, SUB);

        assert!(matches!(result, Err(ImportError::ConfigParse(_))));
    }

    #[test]
    fn test_is_inactive() {
        assert!(is_inactive("VM deallocated"));
        assert!(is_inactive("Stopped"));
        assert!(!is_inactive("VM running"));
        assert!(!is_inactive("Ready"));
    }
}
