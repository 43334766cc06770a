// Library root: the HTTP API, configuration, image store and export, shared
// by the `bidbook` binary and the integration tests.

pub mod api;
pub mod assets;
pub mod config;
pub mod export;
