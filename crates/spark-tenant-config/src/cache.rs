//! # ConfigurationCache：组织单元树上的配置缓存与解析算法
//!
//! ## 核心意图（Why）
//! - 以单把互斥锁保护整个缓存，读写与树遍历（含未命中时的远端抓取）全部在锁内完成；
//! - 保证任何时刻至多一个遍历、读取或写入在进行，调用方不会观察到半更新的条目，
//!   锁定短路也总是基于完整解析过的祖先条目做出判断。
//!
//! ## 行为契约（What）
//! - 每个规范键至多一个条目；
//! - [`ConfigurationCache::resolve`] 自根向下遍历祖先链：锁定值立即返回，未锁定值覆盖候选，
//!   缺席标记不清除已有候选；
//! - 遍历途中抓取到的条目先暂存，遍历成功结束（或锁定短路返回）时一次性提交；
//!   抓取失败时本次查找不留下任何缓存写入；
//! - 复合操作（批量加载、失效处理）通过 [`ConfigurationCache::transaction`] 在同一把锁下完成。
//!
//! ## 风险提示（Trade-offs）
//! - 远端抓取期间持锁，无关键的解析也会被串行化，延迟包含网络往返；
//! - `parking_lot::Mutex` 不可重入，持有 [`CacheTransaction`] 时不得再调用缓存的其它方法。

use std::collections::{BTreeMap, HashMap};

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::{
    connection_strings::{ConnectionStringAggregate, reserved_key},
    error::{RemoteError, Result},
    key::ConfigurationKey,
    org_unit::OrganizationalUnit,
    setting::{AbsentSetting, Setting, ValueSetting},
};

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, Setting>,
    initial_load_complete: bool,
}

/// 解析器独占的配置缓存。
#[derive(Debug, Default)]
pub struct ConfigurationCache {
    state: Mutex<CacheState>,
}

impl ConfigurationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取整把锁，用于需要原子完成的复合操作。
    pub fn transaction(&self) -> CacheTransaction<'_> {
        CacheTransaction {
            state: self.state.lock(),
        }
    }

    pub fn get(&self, key: &ConfigurationKey) -> Option<Setting> {
        self.transaction().get(key).cloned()
    }

    /// 读取条目；缺失时返回针对该键的缺席标记，且不写入缓存。
    pub fn get_or_not_found(&self, key: &ConfigurationKey) -> Setting {
        self.get(key).unwrap_or_else(|| Setting::not_found(key))
    }

    /// 写入或覆盖条目，返回旧值。
    pub fn insert(&self, key: &ConfigurationKey, setting: Setting) -> Option<Setting> {
        self.transaction().insert(key, setting)
    }

    pub fn remove(&self, key: &ConfigurationKey) -> Option<Setting> {
        self.transaction().remove(key)
    }

    pub fn contains_key(&self, canonical: &str) -> bool {
        self.state.lock().entries.contains_key(canonical)
    }

    /// 所有规范键，按字典序排列。
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.state.lock().entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// 有序快照，便于诊断与断言。
    pub fn snapshot(&self) -> BTreeMap<String, Setting> {
        self.state
            .lock()
            .entries
            .iter()
            .map(|(key, setting)| (key.clone(), setting.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    pub fn is_initial_load_complete(&self) -> bool {
        self.state.lock().initial_load_complete
    }

    /// 沿祖先链解析键的有效值。
    ///
    /// # 教案式说明
    /// - **意图 (Why)**：得到“最具体的未锁定值，除非更一般的祖先先行锁定”；
    /// - **逻辑 (How)**：自根到 `key.unit()` 逐节点处理：
    ///   1. 缓存命中直接使用；
    ///   2. 未命中调用 `fetch(node)`：远端给出的值若归属其它单元，记录继承占位的缺席标记；
    ///      缺席结果原样记录；连接串类型的值合并入 `key.unit()` 的聚合条目；
    ///   3. 锁定值立即返回；未锁定值成为新候选；缺席标记保持候选不变；
    ///   4. 遍历结束返回最后的候选，无候选时返回缺席标记；
    /// - **契约 (What)**：`fetch` 在锁内被调用，不得回调本缓存；`fetch` 失败时错误原样返回，
    ///   暂存的条目全部丢弃。
    pub fn resolve<F>(&self, key: &ConfigurationKey, mut fetch: F) -> Result<Setting>
    where
        F: FnMut(&OrganizationalUnit) -> Result<Setting, RemoteError>,
    {
        let mut tx = self.transaction();
        let mut staged: Vec<(ConfigurationKey, Setting)> = Vec::new();
        let mut aggregate: Option<ConnectionStringAggregate> = None;
        let mut candidate: Option<ValueSetting> = None;

        for node in key.unit().ancestor_chain() {
            let node_key = key.at(&node);
            let entry = match tx.get(&node_key) {
                Some(cached) => cached.clone(),
                None => {
                    debug!(key = %node_key, "cache miss; fetching node");
                    let fetched = fetch(&node)?;
                    if let Setting::Value(value) = &fetched {
                        if value.is_connection_string() {
                            aggregate
                                .get_or_insert_with(|| tx.aggregate(key.unit()))
                                .insert(key.name(), value.value.clone());
                        }
                    }
                    let entry = match fetched {
                        Setting::Value(value) if value.organizational_unit != node => {
                            Setting::Absent(AbsentSetting::inherited(&node_key))
                        }
                        other => other,
                    };
                    staged.push((node_key, entry.clone()));
                    entry
                }
            };

            match entry {
                Setting::Value(value) if value.locked => {
                    tx.commit_walk(key.unit(), staged, aggregate);
                    return Ok(Setting::Value(value));
                }
                Setting::Value(value) => candidate = Some(value),
                Setting::Absent(_) => {}
            }
        }

        tx.commit_walk(key.unit(), staged, aggregate);
        Ok(candidate.map_or_else(|| Setting::not_found(key), Setting::Value))
    }
}

/// 持有缓存锁的事务视图。
///
/// 生命周期内独占整个缓存，释放即解锁。
pub struct CacheTransaction<'a> {
    state: MutexGuard<'a, CacheState>,
}

impl CacheTransaction<'_> {
    pub fn get(&self, key: &ConfigurationKey) -> Option<&Setting> {
        self.state.entries.get(key.canonical())
    }

    pub fn insert(&mut self, key: &ConfigurationKey, setting: Setting) -> Option<Setting> {
        self.state
            .entries
            .insert(key.canonical().to_owned(), setting)
    }

    pub fn remove(&mut self, key: &ConfigurationKey) -> Option<Setting> {
        self.state.entries.remove(key.canonical())
    }

    /// 读取某单元的连接串聚合，缺失或损坏时为空映射。
    pub fn aggregate(&self, unit: &OrganizationalUnit) -> ConnectionStringAggregate {
        ConnectionStringAggregate::from_setting(
            self.get(&reserved_key(unit)).and_then(Setting::as_value),
        )
    }

    /// 将聚合写回某单元的保留键。
    pub fn store_aggregate(
        &mut self,
        unit: &OrganizationalUnit,
        aggregate: &ConnectionStringAggregate,
    ) {
        self.insert(&reserved_key(unit), aggregate.to_setting(unit).into());
    }

    pub fn is_initial_load_complete(&self) -> bool {
        self.state.initial_load_complete
    }

    pub fn mark_initial_load_complete(&mut self) {
        self.state.initial_load_complete = true;
    }

    fn commit_walk(
        &mut self,
        unit: &OrganizationalUnit,
        staged: Vec<(ConfigurationKey, Setting)>,
        aggregate: Option<ConnectionStringAggregate>,
    ) {
        for (key, setting) in staged {
            self.insert(&key, setting);
        }
        if let Some(aggregate) = aggregate {
            self.store_aggregate(unit, &aggregate);
        }
    }
}
