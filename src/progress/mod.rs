//! 进度层
//!
//! - `channel` - 后台任务 → 展示层的有序事件通知
//! - `cell_tracker` - 每行状态的权威记录，展示层可随时读取快照

pub mod cell_tracker;
pub mod channel;

pub use cell_tracker::{CellStateTracker, SheetSnapshot};
pub use channel::{progress_channel, ProgressEvent, ProgressReceiver, ProgressSender};
