//! 大文本文件分割：按行数或按字节大小，单次顺序流式处理，内存占用有界。

pub mod config;
pub mod errors;
pub mod events;
pub mod interactive;
pub mod job;
pub mod logger;
pub mod policy;
pub mod sink;
pub mod source;
pub mod split;
pub mod task;

pub use errors::{AppError, ErrorKind};
pub use events::{CancelToken, Event, EventSink, NoEvents, Outcome, Progress, RunStatus, SplitSummary};
pub use job::{PartNaming, SplitJob, SplitPolicy};
pub use split::{Splitter, split_file};
pub use task::{JobHandle, start_job};
