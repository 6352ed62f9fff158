//! 重试时的目标长度收紧策略
//!
//! 第 `n` 次尝试（`n` = 已用重试次数，从 0 开始）的目标长度：
//! `char_limit - n * ceil(char_limit / 10)`，最低不低于 `ceil(char_limit / 2)`（且至少为 1）。
//! 同样的输入永远得到同样的目标，随尝试次数单调不增。

/// 目标长度收紧策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetLengthSchedule {
    /// 每次收紧的比例（百分比）
    step_percent: usize,
    /// 收紧的下限（百分比）
    floor_percent: usize,
}

impl Default for TargetLengthSchedule {
    fn default() -> Self {
        Self {
            step_percent: 10,
            floor_percent: 50,
        }
    }
}

impl TargetLengthSchedule {
    pub fn new(step_percent: usize, floor_percent: usize) -> Self {
        Self {
            step_percent,
            floor_percent: floor_percent.min(100),
        }
    }

    /// 第 `attempt` 次尝试的目标字符数
    pub fn target_for(&self, char_limit: usize, attempt: u32) -> usize {
        if char_limit == 0 {
            return 0;
        }
        let step = percent_ceil(char_limit, self.step_percent);
        let floor = percent_ceil(char_limit, self.floor_percent).max(1);
        let cut = step.saturating_mul(attempt as usize);
        char_limit.saturating_sub(cut).max(floor).min(char_limit)
    }
}

fn percent_ceil(value: usize, percent: usize) -> usize {
    (value.saturating_mul(percent)).div_ceil(100)
}
