/// Load the configuration from a file or a string written in TOML format
pub mod toml;
