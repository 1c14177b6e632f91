//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundary
//! between the service and the homomorphic encryption library.

mod fhe_engine;

pub use fhe_engine::FheEngine;
