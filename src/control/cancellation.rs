use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 批量任务的取消标志
///
/// 展示层（Stop）和新任务提交可以写，调度器只在检查点读取。
/// 不会打断正在进行中的远程调用。
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置取消标志
    ///
    /// 返回本次调用是否真正改变了状态；重复调用是无害的空操作。
    pub fn cancel(&self) -> bool {
        !self.flag.swap(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
