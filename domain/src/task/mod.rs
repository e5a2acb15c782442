//! Task lifecycle domain module

pub mod entities;

pub use entities::{TaskRecord, TaskStatus};
