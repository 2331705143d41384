pub mod config;
pub mod error;
pub mod grid;
pub mod journal;
pub mod limits;
pub mod loader;
pub mod model;
pub mod observability;
pub mod pending;
pub mod projection;
pub mod refresh;
pub mod render;
pub mod session;
pub mod snapshot;
pub mod source;
pub mod tenant;
