//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Cache cleanup: deletes expired rows at the configured interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
