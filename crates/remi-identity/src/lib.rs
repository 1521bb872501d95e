//! First-class identity types for remote interface metadata.
//!
//! These types give descriptors stable, cheaply comparable identities,
//! separating wire identity (`Identifier`) from in-process arena addressing
//! (`InterfaceHandle`, `ParamId`).

mod entities;

pub use entities::{Identifier, InterfaceHandle, ParamId};
