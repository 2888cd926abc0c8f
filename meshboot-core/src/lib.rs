//! meshboot Core
//!
//! Core types and abstractions shared by the meshboot agent and anything
//! that speaks its registration protocol (coordinators, test fixtures).
//!
//! This crate contains:
//! - Domain types: cluster topology, addresses, task identity, server definitions
//! - DTOs: the registration messages exchanged with the coordinator
//! - Codec: the length-prefixed frame format those messages travel in

pub mod codec;
pub mod domain;
pub mod dto;
