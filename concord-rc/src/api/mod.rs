//! HTTP API handlers for concord-rc

pub mod analyze;
pub mod buildinfo;
pub mod health;

pub use analyze::{analyze, analyze_with_views};
pub use buildinfo::get_build_info;
pub use health::health_routes;
