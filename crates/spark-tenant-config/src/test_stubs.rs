//! 测试桩：内存版远端配置服务与记录型观察者。
//!
//! # 设计定位（Why）
//! - 解析器、消费者与宿主的测试都需要一个可编排、可计数的远端协作方；
//! - 集中维护，避免各测试文件重复实现 `ConfigurationReader`/`ConfigurationWriter`。
//!
//! # 使用方式（How）
//! - 以 [`InMemoryConfigurationService::define`] 在某单元上定义值，远端读取按组织单元树
//!   解析（锁定优先、最具体者胜），语义与真实服务一致；
//! - 通过 `*_calls` 方法断言各操作的调用次数；
//! - 通过 [`InMemoryConfigurationService::fail_next`] 让某个操作的下一次调用失败。
//!
//! # 契约说明（What）
//! - 桩对象线程安全，可包装为 `Arc` 同时充当读写两侧；
//! - 写入成功后立即对后续读取可见。

use std::{
    collections::{BTreeMap, HashSet},
    sync::atomic::{AtomicUsize, Ordering},
};

use parking_lot::Mutex;

use crate::{
    error::{RemoteError, RemoteOperation},
    events::{SettingObserver, SettingSignal},
    key::ConfigurationKey,
    org_unit::OrganizationalUnit,
    remote::{ConfigurationReader, ConfigurationWriter},
    setting::{AbsentSetting, Setting, ValueSetting},
};

/// 内存版远端配置服务。
#[derive(Debug, Default)]
pub struct InMemoryConfigurationService {
    settings: Mutex<BTreeMap<ConfigurationKey, ValueSetting>>,
    groups: Mutex<BTreeMap<String, HashSet<String>>>,
    failures: Mutex<HashSet<RemoteOperation>>,
    fetch_log: Mutex<Vec<String>>,
    load_group_calls: AtomicUsize,
    fetch_one_calls: AtomicUsize,
    get_one_calls: AtomicUsize,
    write_calls: AtomicUsize,
}

impl InMemoryConfigurationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在设置自身的单元上定义或覆盖一个值。
    pub fn define(&self, setting: ValueSetting) {
        let key = ConfigurationKey::new(setting.organizational_unit.clone(), setting.key.clone());
        self.settings.lock().insert(key, setting);
    }

    /// 定义一个未锁定的字符串值。
    pub fn define_value(&self, unit: &str, name: &str, value: &str) {
        self.define(ValueSetting::new(OrganizationalUnit::new(unit), name, value));
    }

    /// 定义一个锁定值。
    pub fn define_locked(&self, unit: &str, name: &str, value: &str) {
        self.define(ValueSetting::new(OrganizationalUnit::new(unit), name, value).locked(true));
    }

    /// 定义一个连接串。
    pub fn define_connection_string(&self, unit: &str, name: &str, value: &str) {
        self.define(
            ValueSetting::new(OrganizationalUnit::new(unit), name, value)
                .with_value_type(crate::setting::CONNECTION_STRING_VALUE_TYPE),
        );
    }

    /// 删除某单元上的定义。
    pub fn undefine(&self, unit: &str, name: &str) {
        self.settings
            .lock()
            .remove(&ConfigurationKey::new(OrganizationalUnit::new(unit), name));
    }

    /// 把名称加入配置组，批量加载时返回。
    pub fn add_to_group(&self, group: &str, name: &str) {
        self.groups
            .lock()
            .entry(group.to_owned())
            .or_default()
            .insert(name.to_owned());
    }

    /// 让指定操作的下一次调用失败。
    pub fn fail_next(&self, operation: RemoteOperation) {
        self.failures.lock().insert(operation);
    }

    /// 某单元上的原始定义，不做继承解析。
    pub fn defined(&self, unit: &str, name: &str) -> Option<ValueSetting> {
        self.settings
            .lock()
            .get(&ConfigurationKey::new(OrganizationalUnit::new(unit), name))
            .cloned()
    }

    pub fn load_group_calls(&self) -> usize {
        self.load_group_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_one_calls(&self) -> usize {
        self.fetch_one_calls.load(Ordering::SeqCst)
    }

    /// `fetch_one` 访问过的节点，按调用顺序以规范键记录。
    pub fn fetched_nodes(&self) -> Vec<String> {
        self.fetch_log.lock().clone()
    }

    pub fn get_one_calls(&self) -> usize {
        self.get_one_calls.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    /// 所有读取操作的调用次数之和。
    pub fn read_calls(&self) -> usize {
        self.load_group_calls() + self.fetch_one_calls() + self.get_one_calls()
    }

    fn check(&self, operation: RemoteOperation) -> Result<(), RemoteError> {
        if self.failures.lock().remove(&operation) {
            return Err(RemoteError::new(operation, "injected failure"));
        }
        Ok(())
    }

    /// 以 `unit` 的视角解析名称：锁定优先，否则最具体的定义胜出。
    fn effective(&self, unit: &OrganizationalUnit, name: &str) -> Setting {
        let settings = self.settings.lock();
        let mut candidate = None;
        for node in unit.ancestor_chain() {
            if let Some(setting) = settings.get(&ConfigurationKey::new(node, name)) {
                if setting.locked {
                    return Setting::Value(setting.clone());
                }
                candidate = Some(setting.clone());
            }
        }
        candidate.map_or_else(
            || AbsentSetting::not_found(&ConfigurationKey::new(unit.clone(), name)).into(),
            Setting::Value,
        )
    }
}

impl ConfigurationReader for InMemoryConfigurationService {
    fn load_group(
        &self,
        unit: &OrganizationalUnit,
        group: &str,
    ) -> Result<Vec<ValueSetting>, RemoteError> {
        self.load_group_calls.fetch_add(1, Ordering::SeqCst);
        self.check(RemoteOperation::LoadGroup)?;
        let names: Vec<String> = self
            .groups
            .lock()
            .get(group)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default();
        Ok(names
            .iter()
            .filter_map(|name| self.effective(unit, name).into_value())
            .collect())
    }

    fn fetch_one(
        &self,
        unit: &OrganizationalUnit,
        group: &str,
        name: &str,
    ) -> Result<Setting, RemoteError> {
        self.fetch_one_calls.fetch_add(1, Ordering::SeqCst);
        self.fetch_log
            .lock()
            .push(ConfigurationKey::new(unit.clone(), name).canonical().to_owned());
        self.check(RemoteOperation::FetchOne)?;
        self.add_to_group(group, name);
        Ok(self.effective(unit, name))
    }

    fn get_one(&self, unit: &OrganizationalUnit, name: &str) -> Result<Setting, RemoteError> {
        self.get_one_calls.fetch_add(1, Ordering::SeqCst);
        self.check(RemoteOperation::GetOne)?;
        Ok(self.effective(unit, name))
    }
}

impl ConfigurationWriter for InMemoryConfigurationService {
    fn write(&self, key: &ConfigurationKey, setting: &ValueSetting) -> Result<(), RemoteError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.check(RemoteOperation::Write)?;
        let mut stored = setting.clone();
        stored.organizational_unit = key.unit().clone();
        stored.key = key.name().to_owned();
        self.define(stored);
        Ok(())
    }
}

/// 记录所有收到的信号。
#[derive(Debug, Default)]
pub struct RecordingObserver {
    signals: Mutex<Vec<SettingSignal>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signals(&self) -> Vec<SettingSignal> {
        self.signals.lock().clone()
    }

    pub fn clear(&self) {
        self.signals.lock().clear();
    }
}

impl SettingObserver for RecordingObserver {
    fn on_signal(&self, signal: &SettingSignal) {
        self.signals.lock().push(signal.clone());
    }
}
