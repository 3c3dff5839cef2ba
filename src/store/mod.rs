//! Persistence of the known repository path list.

mod file;

pub use file::FileRepositoryStore;
