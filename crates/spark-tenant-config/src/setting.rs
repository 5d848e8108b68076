//! 解析结果：具体值或“此节点无定义”的标记。
//!
//! ### 设计目的（Why）
//! - 以和类型代替类层次，树遍历中的分支判断由编译器保证穷尽；
//! - “未找到”是数据而非错误，缺席标记本身也会被缓存，避免重复访问远端。
//!
//! ### 契约说明（What）
//! - [`ValueSetting`] 与 [`AbsentSetting`] 的字段以 camelCase 序列化，与远端服务 DTO 对齐；
//! - `value_type` 为 `ConnectionString`（忽略 ASCII 大小写）的值会同步进入连接串聚合视图。

use serde::{Deserialize, Serialize};

use crate::{key::ConfigurationKey, org_unit::OrganizationalUnit};

/// 连接串类型标签。
pub const CONNECTION_STRING_VALUE_TYPE: &str = "ConnectionString";
/// 宿主写入时使用的默认类型标签。
pub const DEFAULT_VALUE_TYPE: &str = "string";
/// 连接串聚合条目的类型标签。
pub const JSON_VALUE_TYPE: &str = "JSON";
/// 缺席标记的状态码，与 HTTP 404 语义一致。
pub const NOT_FOUND_STATUS: u16 = 404;
/// 节点从未定义过该键时的诊断文本。
pub const NOT_FOUND_CONTENT: &str = "No content";
/// 远端以更一般的祖先值作答时，为当前节点记录的诊断文本。
pub const INHERITED_CONTENT: &str =
    "Retrieved settings node is inherited from a more general organizational unit's node.";

/// 在某个组织单元上定义的具体配置值。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueSetting {
    pub key: String,
    #[serde(default)]
    pub organizational_unit: OrganizationalUnit,
    #[serde(default)]
    pub value: String,
    #[serde(default = "default_value_type")]
    pub value_type: String,
    #[serde(default)]
    pub locked: bool,
}

fn default_value_type() -> String {
    DEFAULT_VALUE_TYPE.to_owned()
}

impl ValueSetting {
    /// 以默认类型标签、未锁定状态构造。
    pub fn new(
        organizational_unit: OrganizationalUnit,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            organizational_unit,
            value: value.into(),
            value_type: default_value_type(),
            locked: false,
        }
    }

    pub fn with_value_type(mut self, value_type: impl Into<String>) -> Self {
        self.value_type = value_type.into();
        self
    }

    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    pub fn is_connection_string(&self) -> bool {
        self.value_type
            .eq_ignore_ascii_case(CONNECTION_STRING_VALUE_TYPE)
    }
}

/// “此节点无定义”的缓存标记。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsentSetting {
    pub key: String,
    #[serde(default)]
    pub organizational_unit: OrganizationalUnit,
    #[serde(default)]
    pub content: String,
    #[serde(default = "not_found_status")]
    pub status: u16,
}

fn not_found_status() -> u16 {
    NOT_FOUND_STATUS
}

impl AbsentSetting {
    /// 节点上从未定义过该键。
    pub fn not_found(key: &ConfigurationKey) -> Self {
        Self {
            key: key.name().to_owned(),
            organizational_unit: key.unit().clone(),
            content: NOT_FOUND_CONTENT.to_owned(),
            status: NOT_FOUND_STATUS,
        }
    }

    /// 远端返回的是祖先节点的值，当前节点本身没有定义。
    pub fn inherited(key: &ConfigurationKey) -> Self {
        Self {
            content: INHERITED_CONTENT.to_owned(),
            ..Self::not_found(key)
        }
    }
}

/// 单个节点的解析结果。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Setting {
    Value(ValueSetting),
    Absent(AbsentSetting),
}

impl Setting {
    pub fn not_found(key: &ConfigurationKey) -> Self {
        Self::Absent(AbsentSetting::not_found(key))
    }

    pub fn as_value(&self) -> Option<&ValueSetting> {
        match self {
            Self::Value(value) => Some(value),
            Self::Absent(_) => None,
        }
    }

    pub fn into_value(self) -> Option<ValueSetting> {
        match self {
            Self::Value(value) => Some(value),
            Self::Absent(_) => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent(_))
    }

    /// 结果所属的组织单元。
    pub fn organizational_unit(&self) -> &OrganizationalUnit {
        match self {
            Self::Value(value) => &value.organizational_unit,
            Self::Absent(absent) => &absent.organizational_unit,
        }
    }
}

impl From<ValueSetting> for Setting {
    fn from(value: ValueSetting) -> Self {
        Self::Value(value)
    }
}

impl From<AbsentSetting> for Setting {
    fn from(value: AbsentSetting) -> Self {
        Self::Absent(value)
    }
}
