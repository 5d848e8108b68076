//! 客户端选项：归属单元、配置组与租户库连接串名称。

use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, TenantConfigError},
    org_unit::OrganizationalUnit,
};

/// 租户库连接串的默认名称。
pub const DEFAULT_BASE_CONNECTION_STRING_NAME: &str = "TenancyDatabaseConnection";

/// 解析器的静态选项。
///
/// # 教案式说明
/// - **意图 (Why)**：一个解析器实例只服务一个归属单元与一个配置组，二者在构造时确定；
/// - **契约 (What)**：
///   - `organizational_unit` 为应用的归属单元，未带单元前缀的键都在此单元上解析；
///   - `configuration_group` 为批量加载与未命中登记使用的配置组，不能为空；
///   - `base_connection_string_name` 为租户库连接串的名称，缺省为
///     [`DEFAULT_BASE_CONNECTION_STRING_NAME`]。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ClientOptions {
    #[serde(default)]
    pub organizational_unit: OrganizationalUnit,
    pub configuration_group: String,
    #[serde(default = "default_base_connection_string_name")]
    pub base_connection_string_name: String,
}

fn default_base_connection_string_name() -> String {
    DEFAULT_BASE_CONNECTION_STRING_NAME.to_owned()
}

impl ClientOptions {
    pub fn new(
        organizational_unit: OrganizationalUnit,
        configuration_group: impl Into<String>,
    ) -> Self {
        Self {
            organizational_unit,
            configuration_group: configuration_group.into(),
            base_connection_string_name: default_base_connection_string_name(),
        }
    }

    pub fn with_base_connection_string_name(mut self, name: impl Into<String>) -> Self {
        self.base_connection_string_name = name.into();
        self
    }

    /// 校验选项。
    pub fn validate(&self) -> Result<()> {
        if self.configuration_group.trim().is_empty() {
            return Err(TenantConfigError::InvalidOptions {
                reason: "configuration_group must not be empty".to_owned(),
            });
        }
        if self.base_connection_string_name.trim().is_empty() {
            return Err(TenantConfigError::InvalidOptions {
                reason: "base_connection_string_name must not be empty".to_owned(),
            });
        }
        Ok(())
    }
}
