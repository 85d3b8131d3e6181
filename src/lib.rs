pub mod errors;
pub mod tree;

pub mod database;
pub mod server;
pub mod services;
