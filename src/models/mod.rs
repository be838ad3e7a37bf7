pub mod report;
pub mod submission;
pub mod task;

pub use report::{ErrorKind, ProcessingProgress, TaskResult};
pub use submission::{AnswerEntry, SubmissionPayload, SubmissionPolicy, SubmissionStatus};
pub use task::{Question, QuestionType, Room, Task, TaskDetail};
