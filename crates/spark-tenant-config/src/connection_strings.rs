//! 连接串聚合视图：名称到连接串的派生映射。
//!
//! 聚合以 JSON 对象文本存放在保留键 `(unit, "ConnectionStrings")` 上，
//! 每次更新都是“读出、合并、写回”。单个连接串的查询是对该文本的路径查询，
//! 不会触发独立的树遍历。

use std::collections::BTreeMap;

use crate::{
    key::{CONNECTION_STRINGS_GROUP, ConfigurationKey},
    org_unit::OrganizationalUnit,
    setting::{JSON_VALUE_TYPE, ValueSetting},
};

/// 某个组织单元的聚合条目所用的保留键。
pub fn reserved_key(unit: &OrganizationalUnit) -> ConfigurationKey {
    ConfigurationKey::new(unit.clone(), CONNECTION_STRINGS_GROUP)
}

/// 反序列化后的连接串映射，按名称有序。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionStringAggregate {
    entries: BTreeMap<String, String>,
}

impl ConnectionStringAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从聚合文本解析。
    ///
    /// 文本不是字符串映射时返回空映射，并记录一条告警。
    pub fn parse(document: &str) -> Self {
        match serde_json::from_str::<BTreeMap<String, String>>(document) {
            Ok(entries) => Self { entries },
            Err(error) => {
                tracing::warn!(%error, "connection string aggregate is not a string map; resetting");
                Self::default()
            }
        }
    }

    /// 从缓存中的聚合条目解析；条目缺失时为空映射。
    pub fn from_setting(setting: Option<&ValueSetting>) -> Self {
        setting.map_or_else(Self::default, |setting| Self::parse(&setting.value))
    }

    pub fn to_json(&self) -> String {
        // `BTreeMap<String, String>` 的序列化不会失败。
        serde_json::to_string(&self.entries).unwrap_or_else(|_| "{}".to_owned())
    }

    /// 生成可直接写回缓存的聚合条目。
    pub fn to_setting(&self, unit: &OrganizationalUnit) -> ValueSetting {
        ValueSetting::new(unit.clone(), CONNECTION_STRINGS_GROUP, self.to_json())
            .with_value_type(JSON_VALUE_TYPE)
    }

    /// 设置或覆盖一项，返回映射是否发生变化。
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        let value = value.into();
        if self.entries.get(&name) == Some(&value) {
            return false;
        }
        self.entries.insert(name, value);
        true
    }

    /// 移除一项，返回是否存在过。
    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for ConnectionStringAggregate {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_reports_change_only_for_new_values() {
        let mut aggregate = ConnectionStringAggregate::new();
        assert!(aggregate.insert("Orders", "Server=a"));
        assert!(!aggregate.insert("Orders", "Server=a"));
        assert!(aggregate.insert("Orders", "Server=b"));
        assert_eq!(aggregate.get("Orders"), Some("Server=b"));
    }

    #[test]
    fn serializes_sorted_by_name() {
        let aggregate: ConnectionStringAggregate =
            [("b", "2"), ("a", "1")].into_iter().collect();
        assert_eq!(aggregate.to_json(), r#"{"a":"1","b":"2"}"#);
        assert_eq!(ConnectionStringAggregate::parse(&aggregate.to_json()), aggregate);
    }

    #[test]
    fn corrupt_document_resets_to_empty() {
        assert!(ConnectionStringAggregate::parse("[1,2]").is_empty());
        assert!(ConnectionStringAggregate::from_setting(None).is_empty());
    }

    #[test]
    fn reserved_key_is_per_unit() {
        assert_eq!(
            reserved_key(&OrganizationalUnit::new("acme")).canonical(),
            "acme|ConnectionStrings"
        );
    }
}
