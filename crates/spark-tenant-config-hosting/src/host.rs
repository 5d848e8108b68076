use std::{fmt, sync::Arc};

use spark_tenant_config::{
    SettingChangedConsumer, SettingDeletedConsumer, SettingEvents, SettingNotification,
    SettingObserver, SettingSignal, TenantConfigurationProvider,
};
use tracing::debug;

use crate::{error::HostError, settings::HostSettings};

/// 装配完成的租户配置宿主。
///
/// # 教案级注释
/// - **设计目的 (Why)**
///   - 把解析器、观察者注册表与两个失效消费者集中在一处，宿主启动后以单一入口向下传递；
///   - 通知传输层只需把收到的负载交给 [`dispatch_json`](Self::dispatch_json)，无需了解消费者细节。
/// - **关键要素 (How)**
///   - `provider`：应用读取配置的门面，可克隆 `Arc` 分发给业务组件；
///   - `events`：观察者注册表，消费者产生的信号经由它广播；
///   - `changed` / `deleted`：共享解析器缓存与托管键登记表的消费者。
/// - **契约说明 (What)**
///   - 通知逐条同步处理，无内部排队；并发投递时由缓存锁串行化；
///   - 分发结果返回本次广播的信号，便于传输层记录或确认。
pub struct TenantConfigHost {
    settings: HostSettings,
    provider: Arc<TenantConfigurationProvider>,
    events: Arc<SettingEvents>,
    changed: SettingChangedConsumer,
    deleted: SettingDeletedConsumer,
}

impl TenantConfigHost {
    pub(crate) fn new(
        settings: HostSettings,
        provider: Arc<TenantConfigurationProvider>,
        events: Arc<SettingEvents>,
    ) -> Self {
        let context = provider.invalidation_context(Arc::clone(&events));
        Self {
            settings,
            provider,
            events,
            changed: SettingChangedConsumer::new(context.clone()),
            deleted: SettingDeletedConsumer::new(context),
        }
    }

    pub fn settings(&self) -> &HostSettings {
        &self.settings
    }

    pub fn provider(&self) -> &Arc<TenantConfigurationProvider> {
        &self.provider
    }

    pub fn events(&self) -> &Arc<SettingEvents> {
        &self.events
    }

    /// 运行期追加观察者。
    pub fn subscribe(&self, observer: Arc<dyn SettingObserver>) {
        self.events.subscribe(observer);
    }

    /// 把一条通知路由到对应的消费者。
    pub fn dispatch(
        &self,
        notification: &SettingNotification,
    ) -> Result<Vec<SettingSignal>, HostError> {
        debug!(
            key = notification.key(),
            organizational_unit = %notification.organizational_unit(),
            "dispatching setting notification"
        );
        let signals = match notification {
            SettingNotification::Changed(message) => self.changed.consume(message)?,
            SettingNotification::Deleted(message) => self.deleted.consume(message)?,
        };
        Ok(signals)
    }

    /// 解码 JSON 负载后分发。
    pub fn dispatch_json(&self, payload: &str) -> Result<Vec<SettingSignal>, HostError> {
        let notification: SettingNotification = serde_json::from_str(payload)?;
        self.dispatch(&notification)
    }
}

impl fmt::Debug for TenantConfigHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantConfigHost")
            .field("settings", &self.settings)
            .field("provider", &self.provider)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}
