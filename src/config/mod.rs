//! Tool configuration

pub mod prebuild_toml;

pub use prebuild_toml::{PrebuildConfig, CONFIG_FILE_NAME};
