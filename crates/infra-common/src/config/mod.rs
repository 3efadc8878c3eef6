/*!
Configuration System

Layered configuration loading for the kiosk binaries. Values are resolved in
order: struct defaults, then an optional TOML file, then prefixed environment
variables.
*/

pub mod loader;

pub use loader::load_layered;
