pub mod clean;
pub mod import;
pub mod rules;

pub use clean::CleanCommand;
pub use import::ImportCommand;
pub use rules::RulesCommand;
