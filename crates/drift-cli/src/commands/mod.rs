//! Command implementations for drift-cli

pub mod listing;
pub mod repo;
pub mod task;
pub mod work;

pub use listing::{run_pulls, run_updates};
pub use repo::{run_repo_add, run_repo_delete, run_repo_list, run_repo_show, run_repo_update};
pub use task::{run_task_list, run_task_retry, run_task_show};
pub use work::run_work;
