//! 控制器事件与订阅者.

use crate::contour::SlotChange;
use crate::Label;

/// 控制器在状态变化后同步发出的事件.
#[derive(Clone, Debug, PartialEq)]
pub enum InterpolationEvent {
    /// 某个 label 的轮廓列表被写入.
    ContoursModified {
        /// 被写入的 label.
        label: Label,
        /// 写入结果 (追加或覆盖的槽位).
        change: SlotChange,
    },

    /// 当前 label 发生切换.
    ActiveLabelChanged {
        /// 新的当前 label.
        label: Label,
    },

    /// 某个 label 的全部轮廓被删除.
    LabelRemoved {
        /// 被删除的 label.
        label: Label,
    },

    /// 插值成功, 结果已替换.
    Interpolated {
        /// 插值所用的 label.
        label: Label,
        /// 结果网格顶点个数.
        vertices: usize,
        /// 结果网格三角面片个数.
        faces: usize,
    },
}

/// 事件订阅者.
pub trait InterpolationObserver: Send {
    /// 接收一个事件. 在控制器的同一线程上同步调用.
    fn notify(&mut self, event: &InterpolationEvent);
}

impl<F: FnMut(&InterpolationEvent) + Send> InterpolationObserver for F {
    #[inline]
    fn notify(&mut self, event: &InterpolationEvent) {
        self(event)
    }
}

/// 订阅凭据, 用于取消订阅.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ObserverId(pub(super) u64);

/// 订阅者列表.
#[derive(Default)]
pub(super) struct Observers {
    next: u64,
    list: Vec<(ObserverId, Box<dyn InterpolationObserver>)>,
}

impl Observers {
    pub(super) fn subscribe(&mut self, observer: Box<dyn InterpolationObserver>) -> ObserverId {
        let id = ObserverId(self.next);
        self.next += 1;
        self.list.push((id, observer));
        id
    }

    pub(super) fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.list.len();
        self.list.retain(|(i, _)| *i != id);
        self.list.len() != before
    }

    pub(super) fn len(&self) -> usize {
        self.list.len()
    }

    /// 按订阅顺序通知.
    pub(super) fn emit(&mut self, event: InterpolationEvent) {
        for (_, o) in self.list.iter_mut() {
            o.notify(&event);
        }
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("next", &self.next)
            .field("count", &self.list.len())
            .finish()
    }
}
