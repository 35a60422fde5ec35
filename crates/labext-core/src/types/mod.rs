//! Core type definitions used across the LabExtended workspace.

pub mod id;

pub use id::*;
