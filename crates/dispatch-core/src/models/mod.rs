pub mod completion;
pub mod error;
pub mod outcome;
pub mod task;

pub use completion::{CompletionLevel, CompletionRecord};
pub use error::{CoreError, CoreErrorKind};
pub use outcome::{TaskOutcome, TaskResult, TaskStatus, TaskValue};
pub use task::{Category, Task, TaskId, TaskPayload};
