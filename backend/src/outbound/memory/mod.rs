//! Process-local adapters used by tests and when no database is configured.

mod in_memory_repository;
mod in_memory_search_index;

pub use in_memory_repository::InMemoryRepository;
pub use in_memory_search_index::InMemorySearchIndex;
