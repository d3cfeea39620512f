pub mod inventory;

pub use inventory::InventoryDiscovery;
