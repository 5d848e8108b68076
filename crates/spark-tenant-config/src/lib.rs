#![deny(unsafe_code)]

//! # spark-tenant-config
//!
//! ## 设计目的（Why）
//! - 为按组织单元树划分的多租户应用解析配置：一般层级定义的值被所有后代继承，更具体的单元
//!   可以覆盖，标记为“锁定”的值则禁止后代再覆盖；
//! - 值在首次访问时从远端惰性抓取并缓存，随后由异步到达的变更/删除通知维持新鲜。
//!
//! ## 模块地图（What）
//! - [`org_unit`] / [`key`] / [`setting`]：组织单元、配置键与解析结果的数据模型；
//! - [`cache`]：单锁保护的缓存与树遍历算法；
//! - [`connection_strings`] / [`path_query`]：连接串聚合视图与结构化值路径查询；
//! - [`provider`]：批量加载、单键查找、直写与子键枚举；
//! - [`registry`] / [`consumers`] / [`events`]：托管键登记、失效消费者与观察者信号；
//! - [`remote`]：远端协作方契约；[`reload`]：写入后的重载令牌；[`options`]：客户端选项；
//! - [`test_stubs`]：内存版远端服务与记录型观察者。
//!
//! ## 并发模型（How）
//! - 缓存是唯一的共享可变状态，由一把 `parking_lot::Mutex` 覆盖全部读写与树遍历，
//!   未命中时的远端抓取同样在锁内执行；
//! - 托管键登记表基于 `DashSet`，重载令牌基于 `ArcSwap`，二者均不与缓存锁嵌套。

pub mod cache;
pub mod connection_strings;
pub mod consumers;
pub mod error;
pub mod events;
pub mod key;
pub mod options;
pub mod org_unit;
pub mod path_query;
pub mod provider;
pub mod registry;
pub mod reload;
pub mod remote;
pub mod setting;
/// 测试桩命名空间，供本 crate 与下游宿主的集成测试复用。
pub mod test_stubs;

pub use cache::{CacheTransaction, ConfigurationCache};
pub use connection_strings::ConnectionStringAggregate;
pub use consumers::{
    InvalidationContext, SettingChanged, SettingChangedConsumer, SettingDeleted,
    SettingDeletedConsumer, SettingNotification,
};
pub use error::{RemoteError, RemoteOperation, Result, TenantConfigError};
pub use events::{SettingEvents, SettingObserver, SettingSignal};
pub use key::{ConfigurationKey, KeyQuery, managed_name};
pub use options::ClientOptions;
pub use org_unit::OrganizationalUnit;
pub use path_query::{child_paths, query_path};
pub use provider::{Lookup, TenantConfigurationProvider};
pub use registry::ManagedKeyRegistry;
pub use reload::{ReloadSignal, ReloadToken};
pub use remote::{ConfigurationReader, ConfigurationWriter};
pub use setting::{AbsentSetting, Setting, ValueSetting};
