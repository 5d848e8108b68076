//! 宿主装配与通知分发的端到端验证。
//!
//! # 教案式说明
//! - **测试目标（Why）**：确认设置、解析器、消费者与观察者经构建器串联后协同工作；
//! - **测试设计（How）**：以 TOML 文本构造设置，以内存版远端服务充当读写两侧，
//!   通过 JSON 负载驱动失效处理；
//! - **验收契约（What）**：读取走继承语义，通知信号到达观察者，非法负载以错误返回。

use std::sync::Arc;

use spark_tenant_config::{
    OrganizationalUnit, SettingSignal,
    test_stubs::{InMemoryConfigurationService, RecordingObserver},
};
use spark_tenant_config_hosting::{HostError, HostSettings, TenantConfigHostBuilder};

const SETTINGS: &str = r#"
[client]
configuration_group = "billing"

[telemetry]
filter = "debug"
"#;

fn settings() -> HostSettings {
    HostSettings::from_toml_str(SETTINGS, |_| Some("acme.eu".to_owned())).expect("settings")
}

#[test]
fn host_resolves_and_dispatches_notifications() -> anyhow::Result<()> {
    let service = Arc::new(InMemoryConfigurationService::new());
    service.add_to_group("billing", "Timeout");
    service.define_value("acme", "Timeout", "30");
    let observer = Arc::new(RecordingObserver::new());

    let host = TenantConfigHostBuilder::new()
        .with_settings(settings())
        .with_service(service.clone())
        .with_observer(observer.clone())
        .preload()
        .build()?;

    assert_eq!(service.load_group_calls(), 1);
    assert_eq!(
        host.provider().home(),
        &OrganizationalUnit::new("acme.eu")
    );
    let lookup = host.provider().try_get("Timeout")?;
    assert_eq!(lookup.value.as_deref(), Some("30"));

    service.define_value("acme.eu", "Timeout", "45");
    let signals = host.dispatch_json(
        r#"{"type":"changed","key":"Timeout","organizationalUnit":"acme.eu"}"#,
    )?;
    assert_eq!(
        signals,
        [SettingSignal::Changed {
            key: "Timeout".to_owned()
        }]
    );
    assert_eq!(observer.signals(), signals);
    assert_eq!(host.provider().try_get("Timeout")?.value.as_deref(), Some("45"));

    let ignored = host.dispatch_json(r#"{"type":"changed","key":"Unused"}"#)?;
    assert_eq!(
        ignored,
        [SettingSignal::ChangeIgnored {
            key: "Unused".to_owned()
        }]
    );
    Ok(())
}

#[test]
fn malformed_payload_is_rejected() -> anyhow::Result<()> {
    let service = Arc::new(InMemoryConfigurationService::new());
    let host = TenantConfigHostBuilder::new()
        .with_settings(settings())
        .with_service(service)
        .build()?;

    let error = host.dispatch_json(r#"{"type":"renamed","key":"Timeout"}"#).expect_err("unknown type");
    assert!(matches!(error, HostError::Notification(_)));
    Ok(())
}

#[test]
fn builder_requires_collaborators() {
    let error = TenantConfigHostBuilder::new()
        .with_settings(settings())
        .build()
        .expect_err("reader missing");
    assert!(matches!(error, HostError::Missing("reader")));
}

#[test]
fn invalid_options_surface_as_configuration_error() {
    let mut settings = settings();
    settings.client.configuration_group = String::new();
    let error = TenantConfigHostBuilder::new()
        .with_settings(settings)
        .with_service(Arc::new(InMemoryConfigurationService::new()))
        .build()
        .expect_err("blank group");
    assert!(matches!(error, HostError::Configuration(_)));
}
