// types.rs
//
// Type references as they appear in candidate method signatures, before
// introspection classifies them. Arrays nest; the introspector strips rank.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::iface::InterfaceDef;

/// Scalar kinds that serialize without reference-identity tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primitive {
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Char,
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::I8 => "i8",
            Primitive::I16 => "i16",
            Primitive::I32 => "i32",
            Primitive::I64 => "i64",
            Primitive::F32 => "f32",
            Primitive::F64 => "f64",
            Primitive::Char => "char",
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named serializable class, optionally part of a supertype chain.
///
/// Throwables are classes with `throwable` set; `is_assignable_from` walks
/// the chain, which is all the introspector needs for throws-clause checks.
/// Equality and hashing are by fully qualified name: distinct definitions
/// with the same name are treated as the same class.
#[derive(Debug)]
pub struct ClassDef {
    name: Arc<str>,
    parent: Option<Arc<ClassDef>>,
    throwable: bool,
}

impl ClassDef {
    pub fn new(name: impl Into<Arc<str>>, parent: Option<Arc<ClassDef>>, throwable: bool) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            parent,
            throwable,
        })
    }

    /// A plain serializable value class with no supertype chain.
    pub fn serializable(name: impl Into<Arc<str>>) -> Arc<Self> {
        Self::new(name, None, false)
    }

    /// A throwable class, optionally below another throwable.
    pub fn exception(name: impl Into<Arc<str>>, parent: Option<Arc<ClassDef>>) -> Arc<Self> {
        debug_assert!(parent.as_ref().is_none_or(|p| p.throwable));
        Self::new(name, parent, true)
    }

    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<ClassDef>> {
        self.parent.as_ref()
    }

    pub fn is_throwable(&self) -> bool {
        self.throwable
    }

    /// True if `other` is this class or a subclass of it.
    pub fn is_assignable_from(&self, other: &ClassDef) -> bool {
        let mut cur = Some(other);
        while let Some(c) = cur {
            if c.name == self.name {
                return true;
            }
            cur = c.parent.as_deref();
        }
        false
    }
}

impl PartialEq for ClassDef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ClassDef {}

impl Hash for ClassDef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A type mentioned in a candidate method signature.
#[derive(Debug, Clone)]
pub enum TypeRef {
    Primitive(Primitive),
    /// Nullable wrapper around a primitive; still unshared-eligible.
    Boxed(Primitive),
    Str,
    Class(Arc<ClassDef>),
    Iface(Arc<InterfaceDef>),
    Array(Box<TypeRef>),
}

impl TypeRef {
    pub fn iface(def: &Arc<InterfaceDef>) -> Self {
        TypeRef::Iface(def.clone())
    }

    pub fn class(def: &Arc<ClassDef>) -> Self {
        TypeRef::Class(def.clone())
    }

    pub fn array(elem: TypeRef) -> Self {
        TypeRef::Array(Box::new(elem))
    }

    /// Strip array nesting, returning the element type and its rank.
    pub fn peel(&self) -> (&TypeRef, u8) {
        let mut cur = self;
        let mut dims = 0u8;
        while let TypeRef::Array(elem) = cur {
            cur = elem;
            dims += 1;
        }
        (cur, dims)
    }
}

/// Behavioral attributes retrievable from a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodAttrs {
    /// Fire-and-forget: no value returns to the caller.
    pub asynchronous: bool,
    /// The caller may retransmit on transport failure.
    pub idempotent: bool,
    /// Millisecond bound on awaiting a response; -1 means none.
    pub response_timeout_ms: i64,
}

impl Default for MethodAttrs {
    fn default() -> Self {
        Self {
            asynchronous: false,
            idempotent: false,
            response_timeout_ms: -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignable_walks_parent_chain() {
        let root = ClassDef::exception("core.Throwable", None);
        let io = ClassDef::exception("core.IoError", Some(root.clone()));
        let remote = ClassDef::exception("rmi.RemoteFailure", Some(io.clone()));

        assert!(root.is_assignable_from(&remote));
        assert!(io.is_assignable_from(&remote));
        assert!(remote.is_assignable_from(&remote));
        assert!(!remote.is_assignable_from(&io));
    }

    #[test]
    fn class_equality_is_by_name() {
        let a = ClassDef::serializable("demo.Blob");
        let b = ClassDef::serializable("demo.Blob");
        assert_eq!(*a, *b);
    }

    #[test]
    fn peel_counts_rank() {
        let t = TypeRef::array(TypeRef::array(TypeRef::Primitive(Primitive::I32)));
        let (base, dims) = t.peel();
        assert_eq!(dims, 2);
        assert!(matches!(base, TypeRef::Primitive(Primitive::I32)));
    }
}
