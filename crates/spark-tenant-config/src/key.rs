//! 配置键模型：组织单元 + 名称，以及宿主侧组合键的解析。
//!
//! ## 设计目的（Why）
//! - 缓存以 `"{unit}|{name}"` 规范串作为唯一身份，保证同一节点至多一个条目；
//! - 宿主读取配置时只传入一个字符串，需要从中拆出单元、名称与结构化子路径。
//!
//! ## 契约说明（What）
//! - 组合串不含 `|` 时使用调用方给定的默认单元；恰好一个 `|` 时拆分；多于一个返回
//!   [`TenantConfigError::MalformedKey`]；
//! - 名称中第一个 `:` 之后的部分是结构化值的查询路径，不属于键身份；
//! - `ConnectionStrings` 前缀指向连接串聚合视图，而非普通配置项。

use std::{cmp::Ordering, fmt, hash};

use crate::{
    error::{Result, TenantConfigError},
    org_unit::OrganizationalUnit,
};

/// 组织单元与名称之间的分隔符。
pub const UNIT_DELIMITER: char = '|';
/// 名称与结构化子路径之间的分隔符。
pub const PATH_DELIMITER: char = ':';
/// 连接串聚合视图的保留名称。
pub const CONNECTION_STRINGS_GROUP: &str = "ConnectionStrings";

/// `(组织单元, 名称)` 构成的配置键。
///
/// # 教案式说明
/// - **意图 (Why)**：同名配置在不同单元上是不同的树节点，必须以二元组区分；
/// - **契约 (What)**：相等、哈希与排序都以 [`canonical`](Self::canonical) 为准；
/// - **风险 (Trade-offs)**：规范串在构造时一次性拼好，换取缓存查找时零分配。
#[derive(Clone, Debug)]
pub struct ConfigurationKey {
    unit: OrganizationalUnit,
    name: String,
    canonical: String,
}

impl ConfigurationKey {
    pub fn new(unit: OrganizationalUnit, name: impl Into<String>) -> Self {
        let name = name.into();
        let canonical = format!("{unit}{UNIT_DELIMITER}{name}");
        Self {
            unit,
            name,
            canonical,
        }
    }

    /// 根单元上的键。
    pub fn root_level(name: impl Into<String>) -> Self {
        Self::new(OrganizationalUnit::root(), name)
    }

    /// 解析 `[unit|]name` 形式的组合串。
    ///
    /// ### 契约说明（What）
    /// - 无 `|`：单元取 `default_unit`；
    /// - 恰好一个 `|`：左侧为单元、右侧为名称；
    /// - 多于一个 `|`：返回 [`TenantConfigError::MalformedKey`]，不做截断。
    pub fn parse(composite: &str, default_unit: &OrganizationalUnit) -> Result<Self> {
        let mut parts = composite.split(UNIT_DELIMITER);
        let first = parts.next().unwrap_or_default();
        match (parts.next(), parts.next()) {
            (None, _) => Ok(Self::new(default_unit.clone(), first)),
            (Some(name), None) => Ok(Self::new(OrganizationalUnit::new(first), name)),
            (Some(_), Some(_)) => Err(TenantConfigError::MalformedKey {
                input: composite.to_owned(),
            }),
        }
    }

    pub fn unit(&self) -> &OrganizationalUnit {
        &self.unit
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `"{unit}|{name}"` 规范串，缓存身份。
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// 同名键在另一个单元上的对应节点。
    pub fn at(&self, unit: &OrganizationalUnit) -> Self {
        Self::new(unit.clone(), self.name.clone())
    }
}

impl PartialEq for ConfigurationKey {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for ConfigurationKey {}

impl hash::Hash for ConfigurationKey {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl PartialOrd for ConfigurationKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ConfigurationKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical.cmp(&other.canonical)
    }
}

impl fmt::Display for ConfigurationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// 计算用于托管键登记与观察者信号的键名。
///
/// 以 `home` 为视角：若 `unit` 为根、等于 `home` 或是 `home` 的祖先，则只返回名称本身，
/// 否则返回 `"{unit}|{name}"`。
pub fn managed_name(unit: &OrganizationalUnit, name: &str, home: &OrganizationalUnit) -> String {
    if unit.is_root() || unit == home || home.is_descendant_of(unit) {
        name.to_owned()
    } else {
        format!("{unit}{UNIT_DELIMITER}{name}")
    }
}

/// 宿主组合键解析后的查询意图。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyQuery {
    /// 普通配置项，可带结构化子路径。
    Setting {
        key: ConfigurationKey,
        path: Option<String>,
    },
    /// 某单元的连接串聚合视图；`path` 通常是某个连接串的名称。
    ConnectionStrings {
        unit: OrganizationalUnit,
        path: Option<String>,
    },
}

impl KeyQuery {
    /// 解析宿主传入的组合键。
    ///
    /// # 教案式说明
    /// - **意图 (Why)**：宿主门面只有一个字符串入口，这里统一拆出查询目标；
    /// - **逻辑 (How)**：
    ///   1. 空白串返回 [`TenantConfigError::EmptyKey`]；
    ///   2. 按第一个 `:` 切出路径，再交给 [`ConfigurationKey::parse`] 处理单元与名称；
    ///   3. 名称恰为 `ConnectionStrings` 时路由到该单元的聚合视图，带不带单元前缀都一样；
    /// - **契约 (What)**：空路径视为无路径；保留名称永远不会作为普通配置项向远端抓取。
    pub fn parse(composite: &str, default_unit: &OrganizationalUnit) -> Result<Self> {
        if composite.trim().is_empty() {
            return Err(TenantConfigError::EmptyKey);
        }

        let (identity, path) = split_path(composite);
        let key = ConfigurationKey::parse(identity, default_unit)?;
        if key.name() == CONNECTION_STRINGS_GROUP {
            return Ok(Self::ConnectionStrings {
                unit: key.unit().clone(),
                path,
            });
        }
        Ok(Self::Setting { key, path })
    }
}

/// 按第一个 `:` 拆出名称与子路径。
pub(crate) fn split_path(composite: &str) -> (&str, Option<String>) {
    match composite.split_once(PATH_DELIMITER) {
        Some((identity, path)) => (identity, non_empty(path)),
        None => (composite, None),
    }
}

fn non_empty(path: &str) -> Option<String> {
    (!path.is_empty()).then(|| path.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home() -> OrganizationalUnit {
        OrganizationalUnit::new("acme.eu")
    }

    #[test]
    fn parse_without_delimiter_uses_default_unit() {
        let key = ConfigurationKey::parse("Timeout", &home()).expect("parse");
        assert_eq!(key.unit(), &home());
        assert_eq!(key.canonical(), "acme.eu|Timeout");
    }

    #[test]
    fn parse_with_single_delimiter_splits() {
        let key = ConfigurationKey::parse("acme|Timeout", &home()).expect("parse");
        assert_eq!(key.unit().as_str(), "acme");
        assert_eq!(key.name(), "Timeout");
        assert_eq!(ConfigurationKey::root_level("Timeout").canonical(), "|Timeout");
    }

    #[test]
    fn parse_rejects_multiple_delimiters() {
        let error = ConfigurationKey::parse("a|b|c", &home()).expect_err("must fail");
        assert!(matches!(error, TenantConfigError::MalformedKey { input } if input == "a|b|c"));
    }

    #[test]
    fn query_splits_path_after_first_colon() {
        let query = KeyQuery::parse("acme|Feature:a:b:0", &home()).expect("parse");
        let KeyQuery::Setting { key, path } = query else {
            panic!("expected setting query");
        };
        assert_eq!(key.canonical(), "acme|Feature");
        assert_eq!(path.as_deref(), Some("a:b:0"));
    }

    #[test]
    fn query_routes_connection_strings() {
        assert_eq!(
            KeyQuery::parse("ConnectionStrings", &home()).expect("parse"),
            KeyQuery::ConnectionStrings {
                unit: home(),
                path: None
            }
        );
        assert_eq!(
            KeyQuery::parse("ConnectionStrings:Orders", &home()).expect("parse"),
            KeyQuery::ConnectionStrings {
                unit: home(),
                path: Some("Orders".to_owned())
            }
        );
        assert_eq!(
            KeyQuery::parse("acme|ConnectionStrings:Orders", &home()).expect("parse"),
            KeyQuery::ConnectionStrings {
                unit: OrganizationalUnit::new("acme"),
                path: Some("Orders".to_owned())
            }
        );
        // 仅前缀相同的普通名称不属于聚合视图。
        assert!(matches!(
            KeyQuery::parse("ConnectionStringsLegacy", &home()).expect("parse"),
            KeyQuery::Setting { .. }
        ));
    }

    #[test]
    fn query_rejects_blank_input() {
        assert!(matches!(
            KeyQuery::parse("   ", &home()),
            Err(TenantConfigError::EmptyKey)
        ));
    }

    #[test]
    fn managed_name_collapses_home_and_ancestors() {
        let home = home();
        assert_eq!(managed_name(&OrganizationalUnit::root(), "A", &home), "A");
        assert_eq!(managed_name(&home, "A", &home), "A");
        assert_eq!(managed_name(&OrganizationalUnit::new("acme"), "A", &home), "A");
        assert_eq!(
            managed_name(&OrganizationalUnit::new("acme.eu.paris"), "A", &home),
            "acme.eu.paris|A"
        );
        assert_eq!(managed_name(&OrganizationalUnit::new("other"), "A", &home), "other|A");
    }
}
