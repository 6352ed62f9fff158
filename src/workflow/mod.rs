pub mod question_pipeline;
pub mod retry_policy;

pub use question_pipeline::{QuestionPipeline, StateKind, TRANSITIONS};
pub use retry_policy::TargetLengthSchedule;
