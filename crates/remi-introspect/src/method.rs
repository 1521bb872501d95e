// method.rs

use std::fmt::Write as _;
use std::sync::Arc;

use smallvec::SmallVec;

use remi_identity::{Identifier, ParamId};
use remi_model::ClassDef;

use crate::arena::DescriptorArena;
use crate::param::{ParamDescriptor, ValueBase};

/// One remote method, immutable once its interface is resolved.
///
/// Parameter, return, and thrown positions are canonical `ParamId` handles;
/// two methods with equal handles have equal signatures by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub(crate) id: Identifier,
    pub(crate) name: Arc<str>,
    /// None is void.
    pub(crate) ret: Option<ParamId>,
    pub(crate) params: SmallVec<[ParamId; 4]>,
    /// Thrown positions in first-seen order, deduplicated.
    pub(crate) throws: SmallVec<[ParamId; 2]>,
    pub(crate) asynchronous: bool,
    pub(crate) idempotent: bool,
    pub(crate) response_timeout_ms: i64,
}

impl MethodDescriptor {
    pub fn id(&self) -> Identifier {
        self.id
    }

    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub fn return_type(&self) -> Option<ParamId> {
        self.ret
    }

    pub fn params(&self) -> &[ParamId] {
        &self.params
    }

    pub fn throws(&self) -> &[ParamId] {
        &self.throws
    }

    pub fn is_asynchronous(&self) -> bool {
        self.asynchronous
    }

    pub fn is_idempotent(&self) -> bool {
        self.idempotent
    }

    /// Millisecond response bound; -1 is unset.
    pub fn response_timeout_ms(&self) -> i64 {
        self.response_timeout_ms
    }

    /// True if some declared exception is `class` or a supertype of it.
    pub fn declares_class(&self, arena: &DescriptorArena, class: &ClassDef) -> bool {
        self.throws.iter().any(|&t| {
            match arena.param(t) {
                ParamDescriptor::Value {
                    ty, ..
                } => match &ty.base {
                    ValueBase::Class(declared) => declared.is_assignable_from(class),
                    _ => false,
                },
                ParamDescriptor::Remote { .. } => false,
            }
        })
    }

    /// Render `"<ret> [iface.]name(param, …) throws exc, …"`.
    pub fn signature(&self, arena: &DescriptorArena, iface_name: Option<&str>) -> String {
        let mut out = String::new();
        match self.ret {
            Some(ret) => {
                render_param(&mut out, arena, ret);
            }
            None => out.push_str("void"),
        }
        out.push(' ');
        if let Some(iface) = iface_name {
            out.push_str(iface);
            out.push('.');
        }
        out.push_str(&self.name);
        out.push('(');
        for (i, &param) in self.params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            render_param(&mut out, arena, param);
        }
        out.push(')');
        if !self.throws.is_empty() {
            out.push_str(" throws ");
            for (i, &exc) in self.throws.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_param(&mut out, arena, exc);
            }
        }
        out
    }
}

fn render_param(out: &mut String, arena: &DescriptorArena, id: ParamId) {
    match arena.param(id) {
        ParamDescriptor::Value { ty, .. } => {
            let _ = write!(out, "{ty}");
        }
        ParamDescriptor::Remote { iface, dims, .. } => {
            out.push_str(arena.interface_name(*iface));
            for _ in 0..*dims {
                out.push_str("[]");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::SerialType;
    use remi_model::{Primitive, well_known};
    use smallvec::smallvec;

    fn value_id(arena: &mut DescriptorArena, base: ValueBase) -> ParamId {
        arena.intern(ParamDescriptor::Value {
            ty: SerialType { base, dims: 0 },
            unshared: false,
        })
    }

    #[test]
    fn signature_rendering() {
        let mut arena = DescriptorArena::new();
        let i32_id = value_id(&mut arena, ValueBase::Primitive(Primitive::I32));
        let i64_id = value_id(&mut arena, ValueBase::Primitive(Primitive::I64));
        let failure = value_id(
            &mut arena,
            ValueBase::Class(well_known::remote_failure().clone()),
        );

        let m = MethodDescriptor {
            id: Identifier::next(),
            name: "add".into(),
            ret: Some(i64_id),
            params: smallvec![i32_id, i32_id],
            throws: smallvec![failure],
            asynchronous: false,
            idempotent: false,
            response_timeout_ms: -1,
        };

        assert_eq!(
            m.signature(&arena, Some("demo.Calc")),
            "i64 demo.Calc.add(i32, i32) throws rmi.RemoteFailure"
        );
        assert_eq!(m.signature(&arena, None), "i64 add(i32, i32) throws rmi.RemoteFailure");
    }

    #[test]
    fn declares_class_walks_supertypes() {
        let mut arena = DescriptorArena::new();
        let io = value_id(&mut arena, ValueBase::Class(well_known::io_error().clone()));
        let m = MethodDescriptor {
            id: Identifier::next(),
            name: "work".into(),
            ret: None,
            params: smallvec![],
            throws: smallvec![io],
            asynchronous: false,
            idempotent: false,
            response_timeout_ms: -1,
        };

        // io_error is a supertype of remote_failure, so the declaration covers it.
        assert!(m.declares_class(&arena, well_known::remote_failure()));
        assert!(!m.declares_class(&arena, well_known::throwable_root()));
    }
}
