//! Infrastructure module for task storage.
//!
//! This module contains the repository trait, its in-memory and `PostgreSQL`
//! implementations, and the factory that picks one at startup.

pub mod factory;
pub mod in_memory;
pub mod postgres;
pub mod repository;

pub use factory::{
    ConfigurationError, FactoryError, RepositoryConfig, RepositoryFactory, StorageMode,
};
pub use in_memory::InMemoryTaskRepository;
pub use postgres::PostgresTaskRepository;
pub use repository::{
    RepositoryError, RepositoryFuture, TaskCountFilter, TaskRepository, sort_for_listing,
    sort_most_recent_first,
};
