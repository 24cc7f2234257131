pub mod handle;
pub mod mutex;
pub mod prune;
pub mod put;
pub mod records;
