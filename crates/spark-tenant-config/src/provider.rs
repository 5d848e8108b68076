//! # TenantConfigurationProvider：宿主配置门面的租户实现
//!
//! ## 核心意图（Why）
//! - 对宿主只暴露同步的 `try_get` 与 `child_keys` 两个读取入口，屏蔽组织单元树与远端细节；
//! - 负责首读前的批量加载、单键查找（含结构化子路径）、直写更新与托管键登记。
//!
//! ## 架构定位（Where）
//! - 独占一个 [`ConfigurationCache`]，与失效消费者共享同一缓存和 [`ManagedKeyRegistry`]；
//! - 远端通过 [`ConfigurationReader`] / [`ConfigurationWriter`] 注入，本模块不关心传输。
//!
//! ## 行为契约（What）
//! - `load`：幂等，首次调用恰好一次批量往返，完成标记在全部写入之后才置位；
//! - `try_get`：未加载时先加载；普通键走树遍历，`ConnectionStrings` 前缀读取聚合视图；
//! - `set_value`：先写远端，成功后再写缓存、补齐祖先节点并触发重载令牌，失败时缓存不变。

use std::{collections::BTreeMap, fmt, sync::Arc};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{
    cache::ConfigurationCache,
    connection_strings::ConnectionStringAggregate,
    consumers::InvalidationContext,
    error::{Result, TenantConfigError},
    events::SettingEvents,
    key::{CONNECTION_STRINGS_GROUP, ConfigurationKey, KeyQuery, PATH_DELIMITER},
    options::ClientOptions,
    org_unit::OrganizationalUnit,
    path_query::{child_paths, query_path},
    registry::ManagedKeyRegistry,
    reload::{ReloadSignal, ReloadToken},
    remote::{ConfigurationReader, ConfigurationWriter},
    setting::{Setting, ValueSetting},
};

/// 宿主读取的结果。
///
/// `found` 表示键存在有效值；`value` 在子路径无法解析时可以为 `None`。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Lookup {
    pub found: bool,
    pub value: Option<String>,
}

impl Lookup {
    pub fn found(value: Option<String>) -> Self {
        Self { found: true, value }
    }

    pub fn not_found() -> Self {
        Self::default()
    }
}

/// 租户配置解析器。
pub struct TenantConfigurationProvider {
    options: ClientOptions,
    reader: Arc<dyn ConfigurationReader>,
    writer: Arc<dyn ConfigurationWriter>,
    cache: Arc<ConfigurationCache>,
    registry: Arc<ManagedKeyRegistry>,
    reload: ReloadSignal,
    load_gate: Mutex<()>,
}

impl TenantConfigurationProvider {
    /// 以空缓存与空登记表构造解析器。
    pub fn new(
        options: ClientOptions,
        reader: Arc<dyn ConfigurationReader>,
        writer: Arc<dyn ConfigurationWriter>,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            reader,
            writer,
            cache: Arc::new(ConfigurationCache::new()),
            registry: Arc::new(ManagedKeyRegistry::new()),
            reload: ReloadSignal::new(),
            load_gate: Mutex::new(()),
        })
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// 应用的归属单元。
    pub fn home(&self) -> &OrganizationalUnit {
        &self.options.organizational_unit
    }

    pub fn cache(&self) -> &Arc<ConfigurationCache> {
        &self.cache
    }

    pub fn registry(&self) -> &Arc<ManagedKeyRegistry> {
        &self.registry
    }

    /// 为失效消费者准备共享状态。
    pub fn invalidation_context(&self, events: Arc<SettingEvents>) -> InvalidationContext {
        InvalidationContext::new(
            self.home().clone(),
            Arc::clone(&self.cache),
            Arc::clone(&self.registry),
            Arc::clone(&self.reader),
            events,
        )
    }

    /// 批量加载归属单元下的配置组。
    ///
    /// # 教案式说明
    /// - **逻辑 (How)**：
    ///   1. 加载闸门串行化并发的首次加载，闸门内再次检查完成标记；
    ///   2. 一次 `load_group` 往返取回全部值，逐个以其自身 `(unit, name)` 写入缓存；
    ///   3. 连接串类型的值汇总为聚合条目，写入归属单元的保留键；
    ///   4. 最后置位完成标记；
    /// - **契约 (What)**：远端失败时返回 [`TenantConfigError::Remote`]，完成标记保持未置位，
    ///   下一次读取会重新发起加载。
    pub fn load(&self) -> Result<()> {
        let _gate = self.load_gate.lock();
        if self.cache.is_initial_load_complete() {
            return Ok(());
        }

        let group = self.options.configuration_group.as_str();
        let settings = self.reader.load_group(self.home(), group)?;
        let aggregate: ConnectionStringAggregate = settings
            .iter()
            .filter(|setting| setting.is_connection_string())
            .map(|setting| (setting.key.clone(), setting.value.clone()))
            .collect();

        let count = settings.len();
        let mut tx = self.cache.transaction();
        for setting in settings {
            let key =
                ConfigurationKey::new(setting.organizational_unit.clone(), setting.key.clone());
            tx.insert(&key, setting.into());
        }
        tx.store_aggregate(self.home(), &aggregate);
        tx.mark_initial_load_complete();

        info!(
            organizational_unit = %self.home(),
            group,
            count,
            connection_strings = aggregate.len(),
            "initial configuration load complete"
        );
        Ok(())
    }

    /// 宿主读取入口。
    ///
    /// ### 契约说明（What）
    /// - 组合键格式见 [`KeyQuery::parse`]；
    /// - 普通键：登记托管键后沿树解析，有效值存在时 `found == true`，带子路径时返回路径查询结果；
    /// - `ConnectionStrings`：读取归属单元（或显式单元）的聚合，不带路径返回聚合 JSON，
    ///   带路径返回对应连接串，始终 `found == true`，不访问远端。
    pub fn try_get(&self, composite: &str) -> Result<Lookup> {
        if !self.cache.is_initial_load_complete() {
            self.load()?;
        }

        match KeyQuery::parse(composite, self.home())? {
            KeyQuery::ConnectionStrings { unit, path } => {
                let name = path
                    .as_deref()
                    .and_then(|path| path.split(PATH_DELIMITER).next());
                if let Some(name) = name {
                    let key = ConfigurationKey::new(unit.clone(), name);
                    self.registry.register(&key, self.home());
                }
                let document = self.cache.transaction().aggregate(&unit).to_json();
                let value = match path {
                    Some(path) => query_path(&document, &path),
                    None => Some(document),
                };
                Ok(Lookup::found(value))
            }
            KeyQuery::Setting { key, path } => {
                self.registry.register(&key, self.home());
                match self.resolve(&key)? {
                    Setting::Value(setting) => {
                        let value = match path {
                            Some(path) => query_path(&setting.value, &path),
                            None => Some(setting.value),
                        };
                        Ok(Lookup::found(value))
                    }
                    Setting::Absent(_) => Ok(Lookup::not_found()),
                }
            }
        }
    }

    /// 沿组织单元树解析一个键，未命中的节点向远端抓取。
    pub fn resolve(&self, key: &ConfigurationKey) -> Result<Setting> {
        let group = self.options.configuration_group.as_str();
        self.cache.resolve(key, |node| {
            debug!(
                organizational_unit = %node,
                key = key.name(),
                group,
                "fetching configuration node"
            );
            self.reader.fetch_one(node, group, key.name())
        })
    }

    /// 按名称读取连接串。
    pub fn get_connection_string(&self, name: &str) -> Result<Option<String>> {
        let lookup = self.try_get(&format!("{CONNECTION_STRINGS_GROUP}{PATH_DELIMITER}{name}"))?;
        Ok(lookup.value)
    }

    /// 读取租户库连接串，名称来自选项。
    pub fn tenancy_connection_string(&self) -> Result<Option<String>> {
        self.get_connection_string(&self.options.base_connection_string_name)
    }

    /// 直写一个键。
    ///
    /// # 教案式说明
    /// - **意图 (Why)**：本地缓存不得与事实来源分叉；
    /// - **逻辑 (How)**：解析键（缺省单元为归属单元）→ 写远端 → 写缓存 → 沿祖先链预热
    ///   → 触发重载令牌；
    /// - **契约 (What)**：
    ///   - 写入的值类型为 `string`、未锁定；远端失败返回
    ///     [`TenantConfigError::WriteRejected`]，缓存与令牌均不变；
    ///   - 写入成功后同一键的查找完全命中缓存：祖先节点在此处补齐，锁定的祖先仍然优先；
    ///   - 预热失败只记录告警，写入本身已生效，下一次查找会重新抓取缺失节点。
    pub fn set_value(&self, composite: &str, value: impl Into<String>) -> Result<()> {
        if composite.trim().is_empty() {
            return Err(TenantConfigError::EmptyKey);
        }
        let key = ConfigurationKey::parse(composite, self.home())?;
        let setting = ValueSetting::new(key.unit().clone(), key.name(), value);

        self.writer
            .write(&key, &setting)
            .map_err(|source| TenantConfigError::WriteRejected {
                key: key.clone(),
                source,
            })?;
        self.cache.insert(&key, setting.into());
        info!(key = %key, "configuration value written");

        if let Err(error) = self.resolve(&key) {
            warn!(key = %key, %error, "ancestor warm-up after write failed");
        }

        self.reload.signal();
        Ok(())
    }

    /// 列出某父路径下的子键。
    ///
    /// ### 契约说明（What）
    /// - 结果包含 `earlier` 中的全部键；
    /// - 父路径为空时追加缓存中的全部规范键；
    /// - 父路径非空且其值为结构化文档时，追加带面包屑的子路径（见 [`child_paths`]）；
    /// - 返回前按字典序排序。
    pub fn child_keys<I>(&self, earlier: I, parent: Option<&str>) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = String>,
    {
        let mut keys: Vec<String> = earlier.into_iter().collect();
        match parent.filter(|parent| !parent.trim().is_empty()) {
            None => keys.extend(self.cache.keys()),
            Some(parent) => {
                if let Some(document) = self.try_get(parent)?.value {
                    keys.extend(child_paths(&document, parent));
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// 组合键是否已被登记为托管键。
    pub fn has_managed_key(&self, composite: &str) -> Result<bool> {
        let key = ConfigurationKey::parse(composite, self.home())?;
        Ok(self.registry.is_managed(&key, self.home()))
    }

    /// 当前可注册回调的重载令牌。
    pub fn reload_token(&self) -> Arc<ReloadToken> {
        self.reload.current()
    }

    /// 缓存的有序快照。
    pub fn snapshot(&self) -> BTreeMap<String, Setting> {
        self.cache.snapshot()
    }
}

impl fmt::Debug for TenantConfigurationProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantConfigurationProvider")
            .field("options", &self.options)
            .field("cached_entries", &self.cache.len())
            .field("managed_keys", &self.registry.len())
            .finish_non_exhaustive()
    }
}
