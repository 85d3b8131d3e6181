pub mod audit_logs;
pub mod nav_nodes;

pub use audit_logs::*;
pub use nav_nodes::*;
