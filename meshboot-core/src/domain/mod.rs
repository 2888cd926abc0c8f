//! Core domain types
//!
//! These types describe the cluster a task joins: who it is, where it can be
//! reached, what the topology looks like and how a compute server is set up
//! inside it.

pub mod address;
pub mod cluster;
pub mod server;
pub mod task;
