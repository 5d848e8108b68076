//! 宿主构建器。

use std::{fmt, sync::Arc};

use spark_tenant_config::{
    ConfigurationReader, ConfigurationWriter, SettingEvents, SettingObserver,
    TenantConfigurationProvider,
};
use tracing::info;

use crate::{error::HostError, host::TenantConfigHost, settings::HostSettings, telemetry};

/// `TenantConfigHostBuilder` 聚合设置、远端协作方与观察者的装配步骤。
///
/// # 教案级注释
/// - **设计目标 (Why)**
///   - 为应用提供统一的装配入口，避免在各处重复拼装解析器、消费者与遥测；
/// - **关键流程 (How)**
///   1. `with_settings`：载入 [`HostSettings`]；
///   2. `with_reader` / `with_writer` / `with_service`：注入远端协作方；
///   3. `with_observer`：登记应用级观察者；
///   4. `build`：按需安装遥测、校验选项、构造解析器并按需预加载。
/// - **契约说明 (What)**
///   - 缺少设置或协作方时返回 [`HostError::Missing`]；
///   - 选项校验失败或预加载失败以 [`HostError::Configuration`] 返回。
#[derive(Default)]
pub struct TenantConfigHostBuilder {
    settings: Option<HostSettings>,
    reader: Option<Arc<dyn ConfigurationReader>>,
    writer: Option<Arc<dyn ConfigurationWriter>>,
    observers: Vec<Arc<dyn SettingObserver>>,
    install_telemetry: bool,
    preload: bool,
}

impl TenantConfigHostBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(mut self, settings: HostSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_reader(mut self, reader: Arc<dyn ConfigurationReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn with_writer(mut self, writer: Arc<dyn ConfigurationWriter>) -> Self {
        self.writer = Some(writer);
        self
    }

    /// 同一实例同时充当读写两侧。
    pub fn with_service<S>(self, service: Arc<S>) -> Self
    where
        S: ConfigurationReader + ConfigurationWriter + 'static,
    {
        let reader: Arc<dyn ConfigurationReader> = service.clone();
        let writer: Arc<dyn ConfigurationWriter> = service;
        self.with_reader(reader).with_writer(writer)
    }

    pub fn with_observer(mut self, observer: Arc<dyn SettingObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// 构建时安装全局 `tracing` Subscriber。
    pub fn with_telemetry(mut self) -> Self {
        self.install_telemetry = true;
        self
    }

    /// 构建时立即执行批量加载，而非等到首次读取。
    pub fn preload(mut self) -> Self {
        self.preload = true;
        self
    }

    pub fn build(self) -> Result<TenantConfigHost, HostError> {
        let settings = self.settings.ok_or(HostError::Missing("settings"))?;
        let reader = self.reader.ok_or(HostError::Missing("reader"))?;
        let writer = self.writer.ok_or(HostError::Missing("writer"))?;

        if self.install_telemetry {
            telemetry::install(&settings.telemetry)?;
        }

        let provider = Arc::new(TenantConfigurationProvider::new(
            settings.client.clone(),
            reader,
            writer,
        )?);
        if self.preload {
            provider.load()?;
        }

        let events = Arc::new(SettingEvents::new());
        for observer in self.observers {
            events.subscribe(observer);
        }

        info!(
            organizational_unit = %settings.client.organizational_unit,
            group = %settings.client.configuration_group,
            observers = events.observer_count(),
            "tenant configuration host built"
        );
        Ok(TenantConfigHost::new(settings, provider, events))
    }
}

impl fmt::Debug for TenantConfigHostBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantConfigHostBuilder")
            .field("settings", &self.settings)
            .field("has_reader", &self.reader.is_some())
            .field("has_writer", &self.writer.is_some())
            .field("observer_count", &self.observers.len())
            .field("install_telemetry", &self.install_telemetry)
            .field("preload", &self.preload)
            .finish()
    }
}
