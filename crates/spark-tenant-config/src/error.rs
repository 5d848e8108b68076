//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义租户配置客户端对外暴露的错误语义，区分“键格式非法”“远端读失败”“远端写被拒”三类路径；
//! - “未找到”不属于错误，它以 [`Setting::Absent`](crate::setting::Setting::Absent) 数据形式返回。
//!
//! ## 设计要求（What）
//! - 所有错误派生 `thiserror::Error`，可直接交给 `anyhow` 等上层框架；
//! - 解析期错误在构造键时立即返回，不做静默截断；
//! - 远端错误原样携带操作类别，便于日志聚合。

use std::fmt;

use thiserror::Error;

use crate::key::ConfigurationKey;

/// 远端协作方的操作类别。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RemoteOperation {
    /// 按配置组批量加载。
    LoadGroup,
    /// 树遍历未命中时按节点抓取，并在远端登记追踪。
    FetchOne,
    /// 失效刷新时按归属单元读取。
    GetOne,
    /// 单键写入。
    Write,
}

impl RemoteOperation {
    /// 返回稳定的小写标签，用于日志字段。
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LoadGroup => "load_group",
            Self::FetchOne => "fetch_one",
            Self::GetOne => "get_one",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 远端配置服务返回的失败。
///
/// # 教案式说明
/// - **意图 (Why)**：远端协作方的传输细节不在本 crate 范围内，这里只保留“哪个操作失败、为什么”；
/// - **契约 (What)**：`message` 为人类可读描述，实现方可自行拼入状态码或底层错误文本；
/// - **风险 (Trade-offs)**：以 `String` 承载原因会丢失结构化的底层错误，需要精确判别时应在协作方内部完成。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("remote `{operation}` failed: {message}")]
pub struct RemoteError {
    operation: RemoteOperation,
    message: String,
}

impl RemoteError {
    /// 构造远端错误。
    pub fn new(operation: RemoteOperation, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }

    /// 失败的操作类别。
    pub fn operation(&self) -> RemoteOperation {
        self.operation
    }

    /// 失败原因。
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// 租户配置客户端的错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：聚合键解析、远端读写与选项校验的失败路径，调用方只需匹配一个枚举；
/// - **契约 (What)**：
///   - 解析类错误（[`MalformedKey`](Self::MalformedKey)、[`EmptyKey`](Self::EmptyKey)）只影响触发它的那次操作；
///   - [`Remote`](Self::Remote) 表示读取路径失败，本次查找不会留下任何部分写入的缓存条目；
///   - [`WriteRejected`](Self::WriteRejected) 表示写入被远端拒绝，本地缓存保持原状；
/// - **设计权衡 (Trade-offs)**：本 crate 不做内部重试，重试策略归属远端协作方。
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TenantConfigError {
    /// 组合键中出现多个 `|` 分隔符。
    #[error("composite key `{input}` contains more than one `|` delimiter")]
    MalformedKey { input: String },

    /// 组合键为空或仅含空白。
    #[error("composite key must not be empty or whitespace")]
    EmptyKey,

    /// 批量加载、未命中抓取或失效刷新时远端读取失败。
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// 远端拒绝了写入请求。
    #[error("remote rejected write for `{key}`")]
    WriteRejected {
        key: ConfigurationKey,
        #[source]
        source: RemoteError,
    },

    /// 客户端选项未通过校验。
    #[error("invalid client options: {reason}")]
    InvalidOptions { reason: String },
}

/// 本 crate 统一使用的结果别名。
pub type Result<T, E = TenantConfigError> = std::result::Result<T, E>;
