//! Task Tracker Library
//!
//! Per-user task tracking over HTTP: each signed-in principal creates, edits,
//! completes and deletes its own tasks, and sees a dashboard summarizing them.
//! Storage is pluggable between an in-memory table and `PostgreSQL`.

pub mod api;
pub mod domain;
pub mod infrastructure;
