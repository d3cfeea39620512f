//! Infrastructure Import Module
//!
//! Imports existing Azure resources into Terraform/OpenTofu management using
//! import blocks:
//!
//! 1. Render `import-<name>.tf` for a discovered resource:
//!    ```hcl
//!    import {
//!      to = azurerm_storage_account.logs
//!      id = "/subscriptions/.../storageAccounts/logs"
//!    }
//!    ```
//!
//! 2. Run `terraform plan -generate-config-out=generated-plan-import-<name>.tf`
//!
//! 3. Clean the generated configuration so that it plans without errors
//!
//! # Usage
//!
//! ```bash
//! tfimport import --subscription-id 0000 --local-repo-path ./infra \
//!     --resource vms --inventory ./inventory.yaml --tag env prod
//! ```

pub mod discovery;
pub mod error;
pub mod providers;
pub mod workflow;

pub use discovery::{ResourceDescriptor, ResourceDiscovery, ResourceKind};
pub use error::{ImportError, ImportResult};
pub use providers::InventoryDiscovery;
pub use workflow::{ImportOptions, ImportSummary, ImportWorkflow};
