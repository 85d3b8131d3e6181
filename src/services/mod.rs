pub mod audit_service;
pub mod navigation_service;

pub use audit_service::*;
pub use navigation_service::*;
