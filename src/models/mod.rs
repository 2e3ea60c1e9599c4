pub mod profile;
pub mod task;

pub use profile::{Role, UserProfile};
pub use task::{NewTaskRequest, Task, UpdateTaskRequest};
