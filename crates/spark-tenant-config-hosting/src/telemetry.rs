//! 全局 `tracing` Subscriber 的安装。
//!
//! # 教案式说明
//! - **意图（Why）**：客户端库只发出结构化事件，输出格式与过滤由宿主统一决定；
//! - **逻辑（How）**：`registry()` 叠加 `EnvFilter` 与 `fmt` 层后设为全局默认；
//!   `RUST_LOG` 存在时优先于设置中的过滤表达式；
//! - **契约（What）**：进程内只能安装一次，外部已设置 Subscriber 时返回
//!   [`HostError::SubscriberAlreadySet`]，不会覆盖已有配置。

use tracing::dispatcher;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

use crate::{error::HostError, settings::TelemetrySettings};

/// 按设置安装全局 Subscriber。
pub fn install(settings: &TelemetrySettings) -> Result<(), HostError> {
    if dispatcher::has_been_set() {
        return Err(HostError::SubscriberAlreadySet);
    }

    let subscriber = tracing_subscriber::registry()
        .with(build_env_filter(&settings.filter)?)
        .with(fmt::layer().with_ansi(settings.ansi));
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|_| HostError::SubscriberAlreadySet)
}

/// 解析过滤表达式；`RUST_LOG` 可解析时以其为准。
pub fn build_env_filter(directives: &str) -> Result<EnvFilter, HostError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(directives).map_err(|error| HostError::InvalidFilter {
        filter: directives.to_owned(),
        reason: error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unparsable_directives() {
        // 仅在未设置 RUST_LOG 的环境下才会解析设置中的表达式。
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let error = build_env_filter("spark_tenant_config=notalevel").expect_err("invalid");
        assert!(matches!(error, HostError::InvalidFilter { .. }));
    }

    #[test]
    fn second_install_is_refused() {
        let settings = TelemetrySettings::default();
        // 其它测试可能已安装全局 Subscriber，因此首次结果不做断言。
        let _ = install(&settings);
        assert!(matches!(
            install(&settings),
            Err(HostError::SubscriberAlreadySet)
        ));
    }
}
