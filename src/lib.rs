//! remi: remote-method-invocation metadata runtime.
//!
//! Facade over the workspace crates: the reflective interface model, the
//! introspector with its identity cache, and the wire form. Most callers
//! use the process-default context through [`examine`]; embedders that want
//! isolated caches construct their own [`IntrospectionContext`].

mod global;

pub use remi_identity::{Identifier, InterfaceHandle, ParamId};
pub use remi_introspect::{
    DescriptorArena, InterfaceDescriptor, IntrospectError, IntrospectionContext,
    MethodDescriptor, NoSuchMethod, ParamDescriptor, SerialType, ValueBase, decode_interface,
    encode_interface,
};
pub use remi_model as model;

pub use global::{examine, examine_opt, with_context};
