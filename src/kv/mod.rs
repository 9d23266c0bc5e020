pub mod db;

pub use db::{MemoryDb, NodeStore, SledDb};
