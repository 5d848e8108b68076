//! # ManagedKeyRegistry：应用查询过的键集合
//!
//! ## 核心意图（Why）
//! - 失效通知只对应用真正读过的键有意义，登记表用于判断一条通知是否需要处理；
//! - 以实例形式显式注入解析器与消费者，生命周期随宿主，而非进程级单例。
//!
//! ## 行为契约（What）
//! - 只追加不删除；
//! - 登记与查询都以小写的托管键名（见 [`managed_name`]）为准；
//! - 基于 `DashSet`，多线程并发登记与查询无需外部加锁。

use dashmap::DashSet;

use crate::{
    key::{ConfigurationKey, managed_name},
    org_unit::OrganizationalUnit,
};

/// 托管键登记表。
#[derive(Debug, Default)]
pub struct ManagedKeyRegistry {
    keys: DashSet<String>,
}

impl ManagedKeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一次查询。
    ///
    /// 键所在单元的整条祖先链都会被登记：祖先节点上的变更同样会改变该键的有效值。
    pub fn register(&self, key: &ConfigurationKey, home: &OrganizationalUnit) {
        for node in key.unit().ancestor_chain() {
            self.keys
                .insert(managed_name(&node, key.name(), home).to_lowercase());
        }
    }

    /// 判断某单元上的键是否被托管。
    pub fn is_managed(&self, key: &ConfigurationKey, home: &OrganizationalUnit) -> bool {
        self.contains(&managed_name(key.unit(), key.name(), home))
    }

    /// 以托管键名直接查询，忽略大小写。
    pub fn contains(&self, managed: &str) -> bool {
        self.keys.contains(&managed.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
