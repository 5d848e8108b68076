//! 宿主设置：TOML 文件加环境变量兜底。
//!
//! ## 设计目的（Why）
//! - 客户端选项与遥测参数随部署变化，统一从一份 TOML 读取；
//! - 同一镜像部署到不同租户时，归属单元常由环境注入，因此设置文件留空时从
//!   [`STARTUP_ORGANIZATIONAL_UNIT_ENV`] 兜底。
//!
//! ## 契约说明（What）
//! - `[client]` 段对应 [`ClientOptions`]，`[telemetry]` 段可省略；
//! - 环境查找以闭包注入，测试无需修改进程环境。
//!
//! ```toml
//! [client]
//! organizational_unit = "acme.eu"
//! configuration_group = "billing"
//!
//! [telemetry]
//! filter = "spark_tenant_config=debug,info"
//! ```

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use spark_tenant_config::{ClientOptions, OrganizationalUnit};

use crate::error::HostError;

/// 归属单元留空时读取的环境变量。
pub const STARTUP_ORGANIZATIONAL_UNIT_ENV: &str = "STARTUP_ORGANIZATIONAL_UNIT_NAME";

fn default_filter() -> String {
    "info".to_owned()
}

/// 日志输出参数。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetrySettings {
    /// `EnvFilter` 指令；`RUST_LOG` 存在时以其为准。
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub ansi: bool,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            ansi: false,
        }
    }
}

/// 宿主设置根。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSettings {
    pub client: ClientOptions,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl HostSettings {
    pub fn new(client: ClientOptions) -> Self {
        Self {
            client,
            telemetry: TelemetrySettings::default(),
        }
    }

    /// 解析 TOML 文本并应用环境兜底。
    pub fn from_toml_str<E>(text: &str, env: E) -> Result<Self, HostError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let mut settings: Self = toml::from_str(text)?;
        settings.apply_startup_fallback(env);
        Ok(settings)
    }

    /// 读取设置文件，环境取自当前进程。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, HostError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| HostError::SettingsIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text, |name| std::env::var(name).ok())
    }

    /// 归属单元为空时，用环境变量中的启动单元补齐。
    pub fn apply_startup_fallback<E>(&mut self, env: E)
    where
        E: Fn(&str) -> Option<String>,
    {
        if !self.client.organizational_unit.is_root() {
            return;
        }
        if let Some(unit) = env(STARTUP_ORGANIZATIONAL_UNIT_ENV).filter(|unit| !unit.trim().is_empty()) {
            tracing::debug!(organizational_unit = %unit, "using startup organizational unit");
            self.client.organizational_unit = OrganizationalUnit::new(unit);
        }
    }
}
