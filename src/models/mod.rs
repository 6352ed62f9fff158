pub mod job;
pub mod loaders;
pub mod question;
pub mod sheet;

pub use job::{ActivePosition, BatchJob, BatchSummary, JobId, JobStatus};
pub use loaders::{load_workbook, parse_workbook, QuestionDefaults, Workbook};
pub use question::{Answer, ErrorCode, Outcome, ProcessingResult, Question};
pub use sheet::{CellState, Row, SheetKind, SheetState, SheetStatus};
