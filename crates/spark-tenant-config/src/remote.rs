//! 远端配置服务的协作方契约。
//!
//! ## 契约说明（What）
//! - 所有调用都是阻塞式的请求/响应，由实现方自行决定传输、超时与重试；
//! - 读取方法在“未定义”时返回 [`Setting::Absent`]，只有传输或服务故障才返回 [`RemoteError`]；
//! - 实现必须 `Send + Sync`，解析器会在多个调用线程间共享同一实例。
//!
//! ## 风险提示（Trade-offs）
//! - [`ConfigurationReader::fetch_one`] 会在缓存锁内被调用，其耗时直接计入所有并发查找的等待时间。

use crate::{
    error::RemoteError,
    key::ConfigurationKey,
    org_unit::OrganizationalUnit,
    setting::{Setting, ValueSetting},
};

/// 读取侧契约。
pub trait ConfigurationReader: Send + Sync {
    /// 一次往返取回某单元下整个配置组的值。
    fn load_group(
        &self,
        unit: &OrganizationalUnit,
        group: &str,
    ) -> Result<Vec<ValueSetting>, RemoteError>;

    /// 树遍历未命中时抓取单个节点，同时让远端把该键登记到配置组中。
    ///
    /// 远端可以返回更一般祖先上的值，此时返回值的 `organizational_unit` 与 `unit` 不同。
    fn fetch_one(
        &self,
        unit: &OrganizationalUnit,
        group: &str,
        name: &str,
    ) -> Result<Setting, RemoteError>;

    /// 失效刷新时读取某单元视角下的当前值。
    fn get_one(&self, unit: &OrganizationalUnit, name: &str) -> Result<Setting, RemoteError>;
}

/// 写入侧契约。
pub trait ConfigurationWriter: Send + Sync {
    /// 写入单个键；失败时调用方不得更新本地缓存。
    fn write(&self, key: &ConfigurationKey, setting: &ValueSetting) -> Result<(), RemoteError>;
}
