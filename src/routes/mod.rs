//! HTTP routes for Taskway

pub mod health;
pub mod stream;
pub mod tasks;

pub use health::{health_check, readiness_check, version_info};
pub use stream::handle_stream;
pub use tasks::{
    handle_admin_data, handle_create_task, handle_delete_task, handle_task_data,
    handle_update_task,
};
