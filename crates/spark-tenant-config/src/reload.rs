//! 重载令牌：写入成功后通知依赖方重新读取配置。
//!
//! # 设计动机（Why）
//! - 依赖方持有“当前令牌”并在其上注册回调；写入成功后换入新令牌并触发旧令牌；
//! - 换入动作基于 `ArcSwap`，读取当前令牌全程无锁。
//!
//! # 核心契约（What）
//! - 每个令牌至多触发一次，触发后 [`ReloadToken::has_changed`] 恒为 `true`；
//! - 在已触发的令牌上注册回调会立即执行该回调；
//! - [`ReloadSignal::signal`] 之后调用 [`ReloadSignal::current`] 得到的是未触发的新令牌。

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use arc_swap::ArcSwap;
use parking_lot::Mutex;

type Callback = Box<dyn FnOnce() + Send>;

/// 一次性的变更令牌。
#[derive(Default)]
pub struct ReloadToken {
    fired: AtomicBool,
    callbacks: Mutex<Vec<Callback>>,
}

impl ReloadToken {
    pub fn has_changed(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// 注册触发回调。
    pub fn register(&self, callback: impl FnOnce() + Send + 'static) {
        let mut callbacks = self.callbacks.lock();
        if self.has_changed() {
            drop(callbacks);
            callback();
            return;
        }
        callbacks.push(Box::new(callback));
    }

    fn fire(&self) {
        let pending = {
            let mut callbacks = self.callbacks.lock();
            self.fired.store(true, Ordering::Release);
            std::mem::take(&mut *callbacks)
        };
        for callback in pending {
            callback();
        }
    }
}

impl fmt::Debug for ReloadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReloadToken")
            .field("has_changed", &self.has_changed())
            .finish_non_exhaustive()
    }
}

/// 令牌的交换容器。
pub struct ReloadSignal {
    current: ArcSwap<ReloadToken>,
}

impl ReloadSignal {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(ReloadToken::default()),
        }
    }

    /// 当前尚未触发的令牌。
    pub fn current(&self) -> Arc<ReloadToken> {
        self.current.load_full()
    }

    /// 换入新令牌并触发旧令牌。
    pub fn signal(&self) {
        let previous = self.current.swap(Arc::new(ReloadToken::default()));
        previous.fire();
    }
}

impl Default for ReloadSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReloadSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReloadSignal")
            .field("current", &self.current.load_full())
            .finish()
    }
}
