#![deny(unsafe_code)]
#![doc = "spark-tenant-config-hosting: 为租户配置客户端提供宿主装配、遥测安装与通知分发。"]

pub mod builder;
pub mod error;
mod host;
pub mod settings;
pub mod telemetry;

pub use builder::TenantConfigHostBuilder;
pub use error::HostError;
pub use host::TenantConfigHost;
pub use settings::{HostSettings, STARTUP_ORGANIZATIONAL_UNIT_ENV, TelemetrySettings};
