//! # 失效消费者：处理外部的变更/删除通知
//!
//! ## 核心意图（Why）
//! - 远端配置变化以通知形式异步到达，消费者据此刷新或清除缓存条目，并把派生信号转告应用；
//! - 应用从未查询过的键不值得刷新，托管键登记表决定通知是否相关。
//!
//! ## 行为契约（What）
//! - **变更**：未托管 → 广播一次 `ChangeIgnored` 后结束，不访问远端；已托管 → 以归属单元视角
//!   重新读取；结果不是值时记录日志后结束；连接串类型的值合并入聚合，聚合确有变化时广播
//!   `ConnectionStrings:{key}` 变更；值与缓存不同则覆盖并广播键级变更；
//! - **删除**：未托管 → 无操作；已托管 → 清除条目并广播删除，若聚合中存在同名连接串则一并移除并
//!   再广播一次聚合级删除；
//! - 重复投递同一通知得到相同的缓存状态；变更通知的重复投递不再产生信号；
//! - 缓存改写在一次事务内完成，信号在释放缓存锁之后广播。
//!
//! ## 风险提示（Trade-offs）
//! - 变更通知只刷新远端返回值所在的节点；更具体后代上已缓存的继承占位不会被重新校验。

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    cache::ConfigurationCache,
    error::Result,
    events::{SettingEvents, SettingSignal},
    key::{CONNECTION_STRINGS_GROUP, ConfigurationKey, PATH_DELIMITER, managed_name, split_path},
    org_unit::OrganizationalUnit,
    registry::ManagedKeyRegistry,
    remote::ConfigurationReader,
    setting::Setting,
};

/// 配置项在某单元上发生变更。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingChanged {
    pub key: String,
    #[serde(default)]
    pub organizational_unit: OrganizationalUnit,
}

/// 配置项在某单元上被删除。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingDeleted {
    pub key: String,
    #[serde(default)]
    pub organizational_unit: OrganizationalUnit,
}

/// 通知传输层投递的消息，以 `type` 字段区分种类。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SettingNotification {
    Changed(SettingChanged),
    Deleted(SettingDeleted),
}

impl SettingNotification {
    pub fn key(&self) -> &str {
        match self {
            Self::Changed(message) => &message.key,
            Self::Deleted(message) => &message.key,
        }
    }

    pub fn organizational_unit(&self) -> &OrganizationalUnit {
        match self {
            Self::Changed(message) => &message.organizational_unit,
            Self::Deleted(message) => &message.organizational_unit,
        }
    }
}

/// 消费者共享的状态：与解析器同一份缓存与登记表。
#[derive(Clone)]
pub struct InvalidationContext {
    home: OrganizationalUnit,
    cache: Arc<ConfigurationCache>,
    registry: Arc<ManagedKeyRegistry>,
    reader: Arc<dyn ConfigurationReader>,
    events: Arc<SettingEvents>,
}

impl InvalidationContext {
    pub fn new(
        home: OrganizationalUnit,
        cache: Arc<ConfigurationCache>,
        registry: Arc<ManagedKeyRegistry>,
        reader: Arc<dyn ConfigurationReader>,
        events: Arc<SettingEvents>,
    ) -> Self {
        Self {
            home,
            cache,
            registry,
            reader,
            events,
        }
    }

    pub fn events(&self) -> &Arc<SettingEvents> {
        &self.events
    }

    /// 消息中的键去掉子路径后，与消息单元组成缓存键。
    fn target(&self, unit: &OrganizationalUnit, message_key: &str) -> (ConfigurationKey, String) {
        let (name, _) = split_path(message_key);
        let key = ConfigurationKey::new(unit.clone(), name);
        let managed = managed_name(key.unit(), key.name(), &self.home);
        (key, managed)
    }

    fn raise_all(&self, signals: &[SettingSignal]) {
        for signal in signals {
            self.events.raise(signal);
        }
    }
}

impl fmt::Debug for InvalidationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvalidationContext")
            .field("home", &self.home)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

fn aggregate_key(managed: &str) -> String {
    format!("{CONNECTION_STRINGS_GROUP}{PATH_DELIMITER}{managed}")
}

/// 变更通知消费者。
#[derive(Clone, Debug)]
pub struct SettingChangedConsumer {
    context: InvalidationContext,
}

impl SettingChangedConsumer {
    pub fn new(context: InvalidationContext) -> Self {
        Self { context }
    }

    /// 处理一条变更通知，返回已广播的信号。
    ///
    /// # 教案式说明
    /// - **逻辑 (How)**：
    ///   1. 未托管：广播 `ChangeIgnored`，不访问远端；
    ///   2. `get_one(home, name)` 取最新值，非值结果记录日志后返回空列表；
    ///   3. 事务内：连接串合并入归属单元的聚合；新值写入其自身单元的节点；
    ///      若该单元与通知单元不同，丢弃通知单元上的旧条目，下一次遍历重新抓取；
    ///   4. 释放锁后逐个广播信号；
    /// - **契约 (What)**：远端读取失败返回 [`TenantConfigError::Remote`](crate::TenantConfigError::Remote)，缓存不变。
    pub fn consume(&self, message: &SettingChanged) -> Result<Vec<SettingSignal>> {
        let ctx = &self.context;
        let (key, managed) = ctx.target(&message.organizational_unit, &message.key);

        if !ctx.registry.is_managed(&key, &ctx.home) {
            debug!(key = %key, "change notification for unmanaged key ignored");
            let signals = vec![SettingSignal::ChangeIgnored { key: managed }];
            ctx.raise_all(&signals);
            return Ok(signals);
        }

        let setting = match ctx.reader.get_one(&ctx.home, key.name())? {
            Setting::Value(setting) => setting,
            Setting::Absent(absent) => {
                info!(
                    key = key.name(),
                    organizational_unit = %absent.organizational_unit,
                    status = absent.status,
                    "no value setting found for changed key"
                );
                return Ok(Vec::new());
            }
        };

        let mut signals = Vec::new();
        {
            let mut tx = ctx.cache.transaction();

            if setting.is_connection_string() {
                let mut aggregate = tx.aggregate(&ctx.home);
                if aggregate.insert(key.name(), setting.value.clone()) {
                    tx.store_aggregate(&ctx.home, &aggregate);
                    signals.push(SettingSignal::Changed {
                        key: aggregate_key(&managed),
                    });
                }
            }

            let stored = key.at(&setting.organizational_unit);
            let differs = tx.get(&stored).and_then(Setting::as_value) != Some(&setting);
            if stored != key {
                tx.remove(&key);
            }
            if differs {
                tx.insert(&stored, setting.into());
                signals.push(SettingSignal::Changed {
                    key: managed.clone(),
                });
            }
        }

        info!(key = %key, signals = signals.len(), "change notification applied");
        ctx.raise_all(&signals);
        Ok(signals)
    }
}

/// 删除通知消费者。
#[derive(Clone, Debug)]
pub struct SettingDeletedConsumer {
    context: InvalidationContext,
}

impl SettingDeletedConsumer {
    pub fn new(context: InvalidationContext) -> Self {
        Self { context }
    }

    /// 处理一条删除通知，返回已广播的信号。
    pub fn consume(&self, message: &SettingDeleted) -> Result<Vec<SettingSignal>> {
        let ctx = &self.context;
        let (key, managed) = ctx.target(&message.organizational_unit, &message.key);

        if !ctx.registry.is_managed(&key, &ctx.home) {
            debug!(key = %key, "delete notification for unmanaged key skipped");
            return Ok(Vec::new());
        }

        let unit = message.organizational_unit.clone();
        let mut signals = vec![SettingSignal::Deleted {
            organizational_unit: unit.clone(),
            key: managed.clone(),
        }];
        {
            let mut tx = ctx.cache.transaction();
            tx.remove(&key);

            let mut aggregate = tx.aggregate(&ctx.home);
            if aggregate.remove(key.name()) {
                tx.store_aggregate(&ctx.home, &aggregate);
                signals.push(SettingSignal::Deleted {
                    organizational_unit: unit,
                    key: aggregate_key(&managed),
                });
            }
        }

        info!(key = %key, signals = signals.len(), "delete notification applied");
        ctx.raise_all(&signals);
        Ok(signals)
    }
}
