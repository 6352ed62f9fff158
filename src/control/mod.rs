//! 控制层：取消标志与工作表导航锁定
//!
//! 两者都只依赖原子操作，展示层调用时不会阻塞后台任务。

pub mod cancellation;
pub mod navigation;

pub use cancellation::CancellationToken;
pub use navigation::NavigationLock;
