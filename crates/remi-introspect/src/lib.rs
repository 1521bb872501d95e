//! Remote interface introspection.
//!
//! Given a reflective description of a remote interface, `examine` produces
//! a canonical, cached, stably-identified metadata model: interface and
//! method descriptors with interned parameter classifications, suitable for
//! stub generation, wire-compatibility checks, and method routing by
//! compact identifier.
//!
//! Descriptors live in a per-context arena behind stable handles, which is
//! what lets an interface mention itself (or a cycle of interfaces mention
//! each other) in method signatures: a descriptor is published provisionally
//! before its parameters are resolved, and references terminate at handle
//! comparisons instead of walking the cycle.

mod arena;
mod context;
mod errors;
mod examine;
mod iface;
mod method;
mod param;
mod wire;

pub use arena::DescriptorArena;
pub use context::IntrospectionContext;
pub use errors::{IntrospectError, NoSuchMethod};
pub use iface::InterfaceDescriptor;
pub use method::MethodDescriptor;
pub use param::{ParamDescriptor, SerialType, ValueBase};
pub use wire::{decode_interface, encode_interface};
