//! 面向应用观察者的派生信号。
//!
//! ### 设计目的（Why）
//! - 失效消费者改写缓存后，需要告知应用“哪个键变了/被删了/被忽略了”；
//! - 忽略信号与未找到是两回事：前者表示通知与本应用无关，观察者可据此区分。
//!
//! ### 契约说明（What）
//! - 观察者列表由实例持有，订阅与广播可并发进行；
//! - 广播时先复制观察者快照再逐个回调，回调内可以安全地继续订阅。

use std::{fmt, sync::Arc};

use parking_lot::RwLock;

use crate::org_unit::OrganizationalUnit;

/// 失效处理产生的信号。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettingSignal {
    /// 键的有效值已更新。
    Changed { key: String },
    /// 键在某单元上被删除。
    Deleted {
        organizational_unit: OrganizationalUnit,
        key: String,
    },
    /// 通知涉及的键从未被本应用查询，未做处理。
    ChangeIgnored { key: String },
}

impl SettingSignal {
    /// 信号携带的键名。
    pub fn key(&self) -> &str {
        match self {
            Self::Changed { key } | Self::Deleted { key, .. } | Self::ChangeIgnored { key } => key,
        }
    }
}

/// 信号观察者。
pub trait SettingObserver: Send + Sync {
    fn on_signal(&self, signal: &SettingSignal);
}

impl<F> SettingObserver for F
where
    F: Fn(&SettingSignal) + Send + Sync,
{
    fn on_signal(&self, signal: &SettingSignal) {
        self(signal)
    }
}

/// 观察者注册表。
#[derive(Default)]
pub struct SettingEvents {
    observers: RwLock<Vec<Arc<dyn SettingObserver>>>,
}

impl SettingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Arc<dyn SettingObserver>) {
        self.observers.write().push(observer);
    }

    /// 向所有观察者广播信号。
    pub fn raise(&self, signal: &SettingSignal) {
        let observers = self.observers.read().clone();
        for observer in observers {
            observer.on_signal(signal);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }
}

impl fmt::Debug for SettingEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingEvents")
            .field("observer_count", &self.observer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn closures_receive_every_signal() {
        let events = SettingEvents::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        events.subscribe(Arc::new(move |signal: &SettingSignal| {
            assert_eq!(signal.key(), "Timeout");
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        events.raise(&SettingSignal::Changed {
            key: "Timeout".to_owned(),
        });
        events.raise(&SettingSignal::ChangeIgnored {
            key: "Timeout".to_owned(),
        });

        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
