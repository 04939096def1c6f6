pub mod memory;
pub mod sqlite;

#[cfg(test)]
mod tests;

pub use memory::MemorySubscriptionStore;
pub use sqlite::SqliteSubscriptionStore;
