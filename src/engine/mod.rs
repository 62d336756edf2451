pub mod completion;
pub mod dispatch;
pub mod queue;
pub mod scoring;
