//! 宿主装配阶段的错误域。

use spark_tenant_config::TenantConfigError;
use thiserror::Error;

/// 宿主装配与运行期的错误。
///
/// # 教案式说明
/// - **意图 (Why)**：把设置加载、遥测安装、通知解码与客户端本身的失败收拢到一个枚举，
///   启动流程只需一次 `?` 传播；
/// - **契约 (What)**：[`Configuration`](Self::Configuration) 原样包裹客户端错误，
///   调用方可继续匹配其内部变体。
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HostError {
    /// 设置文件读取失败。
    #[error("failed to read host settings from `{path}`")]
    SettingsIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 设置文本不是合法的 TOML 或字段不匹配。
    #[error("failed to decode host settings")]
    SettingsDecode(#[from] toml::de::Error),

    /// 外部已设置全局 `tracing` Subscriber。
    #[error("a global tracing subscriber is already installed")]
    SubscriberAlreadySet,

    /// 日志过滤表达式无法解析。
    #[error("invalid log filter `{filter}`: {reason}")]
    InvalidFilter { filter: String, reason: String },

    /// 通知负载无法解码。
    #[error("failed to decode setting notification")]
    Notification(#[from] serde_json::Error),

    /// 构建器缺少必需的协作方。
    #[error("host builder is missing `{0}`")]
    Missing(&'static str),

    /// 客户端返回的错误。
    #[error(transparent)]
    Configuration(#[from] TenantConfigError),
}
