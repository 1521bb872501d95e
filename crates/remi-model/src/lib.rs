//! Reflective model of candidate remote interfaces.
//!
//! This crate is the input surface of the introspector: a description of an
//! interface (name, visibility, parent interfaces, methods with parameter,
//! return, and thrown types, plus behavioral attributes) that plays the role
//! runtime reflection plays in managed environments. Descriptions can come
//! from anywhere (hand-built in tests, generated from schema files) as long
//! as they produce this model.

mod annotations;
mod iface;
mod types;
pub mod well_known;

pub use annotations::{AnnotationSource, DeclaredAnnotations};
pub use iface::{
    InterfaceBuilder, InterfaceDef, MethodBuilder, MethodDef, VisibleMethod, method,
};
pub use types::{ClassDef, MethodAttrs, Primitive, TypeRef};
