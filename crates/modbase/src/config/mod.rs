pub mod framework_config;

pub use framework_config::{ConfigLoadError, FrameworkConfig};
