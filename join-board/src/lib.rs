//! Task board domain: tasks, contacts and users kept in a remote JSON document store.

pub mod adapters;
mod board;
pub mod domain;

pub use board::{Board, BoardSettings};
