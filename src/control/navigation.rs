use std::sync::atomic::{AtomicUsize, Ordering};

const UNPINNED: usize = usize::MAX;

/// 展示层的工作表锁定
///
/// 未锁定时跟随调度器当前处理的工作表；用户手动选择后锁定，
/// 调度器的任何事件都不会解除锁定，只有用户再次选择才会改变。
#[derive(Debug)]
pub struct NavigationLock {
    pinned: AtomicUsize,
}

impl Default for NavigationLock {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationLock {
    pub fn new() -> Self {
        Self {
            pinned: AtomicUsize::new(UNPINNED),
        }
    }

    /// 锁定到指定工作表，返回之前锁定的下标
    pub fn pin(&self, sheet: usize) -> Option<usize> {
        let previous = self.pinned.swap(sheet.min(UNPINNED - 1), Ordering::AcqRel);
        (previous != UNPINNED).then_some(previous)
    }

    /// 用户明确选择"跟随当前进度"
    pub fn release(&self) -> Option<usize> {
        let previous = self.pinned.swap(UNPINNED, Ordering::AcqRel);
        (previous != UNPINNED).then_some(previous)
    }

    pub fn pinned(&self) -> Option<usize> {
        let value = self.pinned.load(Ordering::Acquire);
        (value != UNPINNED).then_some(value)
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned().is_some()
    }

    /// 计算应显示的工作表：锁定优先，否则跟随 `active`
    pub fn resolve(&self, active: Option<usize>) -> Option<usize> {
        self.pinned().or(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_active_until_pinned() {
        let lock = NavigationLock::new();
        assert_eq!(lock.resolve(Some(2)), Some(2));
        assert_eq!(lock.resolve(None), None);

        assert_eq!(lock.pin(0), None);
        assert_eq!(lock.resolve(Some(3)), Some(0));
        assert_eq!(lock.resolve(Some(4)), Some(0));
    }

    #[test]
    fn only_explicit_selection_changes_the_pin() {
        let lock = NavigationLock::new();
        lock.pin(1);
        assert_eq!(lock.pin(2), Some(1));
        assert_eq!(lock.pinned(), Some(2));

        assert_eq!(lock.release(), Some(2));
        assert!(!lock.is_pinned());
        assert_eq!(lock.resolve(Some(5)), Some(5));
    }
}
