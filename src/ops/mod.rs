pub mod entry_ops;
pub mod task_ops;
