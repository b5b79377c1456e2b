//! Command implementations for console-cli

pub mod explain;
pub mod resolve;
pub mod routes;

pub use explain::explain;
pub use resolve::resolve;
pub use routes::routes;
