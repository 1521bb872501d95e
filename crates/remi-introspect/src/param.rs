// param.rs
//
// Interned parameter descriptors. A descriptor covers one parameter,
// return, or thrown position: either a serialized value or a reference to
// a remote interface, with array rank and the unshared marshalling flag.

use std::fmt;
use std::sync::Arc;

use remi_identity::InterfaceHandle;
use remi_model::{ClassDef, Primitive};

/// Element kind of a serialized value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueBase {
    Primitive(Primitive),
    /// Nullable primitive wrapper; still unshared-eligible.
    Boxed(Primitive),
    Str,
    Class(Arc<ClassDef>),
}

impl ValueBase {
    /// True for kinds serialized without reference-identity tracking.
    pub fn unshared_eligible(&self) -> bool {
        !matches!(self, ValueBase::Class(_))
    }
}

impl fmt::Display for ValueBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueBase::Primitive(p) => f.write_str(p.name()),
            ValueBase::Boxed(p) => write!(f, "box<{}>", p.name()),
            ValueBase::Str => f.write_str("str"),
            ValueBase::Class(c) => f.write_str(c.name()),
        }
    }
}

/// Fully assembled serialized type: element kind plus array rank.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SerialType {
    pub base: ValueBase,
    pub dims: u8,
}

impl fmt::Display for SerialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        for _ in 0..self.dims {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

/// One classified parameter, return, or thrown position.
///
/// Descriptors are interned in the owning arena: structural equality means
/// identical `ParamId`, so wire routing compares handles, never structures.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamDescriptor {
    Value {
        ty: SerialType,
        unshared: bool,
    },
    Remote {
        iface: InterfaceHandle,
        dims: u8,
        unshared: bool,
    },
}

impl ParamDescriptor {
    pub fn is_remote(&self) -> bool {
        matches!(self, ParamDescriptor::Remote { .. })
    }

    /// The referenced interface, when this is a remote reference.
    pub fn remote_type(&self) -> Option<InterfaceHandle> {
        match self {
            ParamDescriptor::Remote { iface, .. } => Some(*iface),
            ParamDescriptor::Value { .. } => None,
        }
    }

    /// The serialized type, when this is a value.
    pub fn serialized_type(&self) -> Option<&SerialType> {
        match self {
            ParamDescriptor::Value { ty, .. } => Some(ty),
            ParamDescriptor::Remote { .. } => None,
        }
    }

    pub fn array_rank(&self) -> u8 {
        match self {
            ParamDescriptor::Value { ty, .. } => ty.dims,
            ParamDescriptor::Remote { dims, .. } => *dims,
        }
    }

    pub fn is_unshared(&self) -> bool {
        match self {
            ParamDescriptor::Value { unshared, .. } => *unshared,
            ParamDescriptor::Remote { unshared, .. } => *unshared,
        }
    }

    pub(crate) fn to_unshared(&self, unshared: bool) -> ParamDescriptor {
        let mut out = self.clone();
        match &mut out {
            ParamDescriptor::Value { unshared: u, .. } => *u = unshared,
            ParamDescriptor::Remote { unshared: u, .. } => *u = unshared,
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_values_are_not_unshared_eligible() {
        let blob = ClassDef::serializable("demo.Blob");
        assert!(!ValueBase::Class(blob).unshared_eligible());
        assert!(ValueBase::Primitive(Primitive::I64).unshared_eligible());
        assert!(ValueBase::Boxed(Primitive::Bool).unshared_eligible());
        assert!(ValueBase::Str.unshared_eligible());
    }

    #[test]
    fn serial_type_renders_rank() {
        let ty = SerialType {
            base: ValueBase::Primitive(Primitive::I32),
            dims: 2,
        };
        assert_eq!(ty.to_string(), "i32[][]");
    }

    #[test]
    fn to_unshared_flips_only_the_flag() {
        let p = ParamDescriptor::Value {
            ty: SerialType {
                base: ValueBase::Str,
                dims: 0,
            },
            unshared: true,
        };
        let q = p.to_unshared(false);
        assert!(!q.is_unshared());
        assert_eq!(q.serialized_type(), p.serialized_type());
    }
}
