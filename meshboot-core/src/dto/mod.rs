//! Data Transfer Objects for the registration handshake
//!
//! These are the messages exchanged between a task and the coordinator.
//! They are serialized as JSON and carried in length-prefixed frames
//! (see [`crate::codec`]).

pub mod registration;
