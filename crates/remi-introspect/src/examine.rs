// examine.rs
//
// Introspection entry point: validate a candidate interface, merge methods
// inherited through multiple parents, publish a provisional descriptor,
// then resolve parameter classifications. The provisional slot is cached
// before resolve so self- and mutually-referential signatures find a handle
// instead of recursing forever.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::{debug, warn};

use remi_identity::{Identifier, InterfaceHandle, ParamId};
use remi_model::{ClassDef, InterfaceDef, MethodAttrs, MethodDef, TypeRef, well_known};

use crate::context::IntrospectionContext;
use crate::errors::IntrospectError;
use crate::iface::InterfaceDescriptor;
use crate::method::MethodDescriptor;
use crate::param::{ParamDescriptor, SerialType, ValueBase};

/// Pre-resolve view of one parameter position. Every position starts as a
/// temporary so that a method may mention its own interface without the
/// introspector chasing the cycle before the descriptor is published.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TempParam {
    base: TempBase,
    dims: u8,
    unshared: bool,
}

#[derive(Debug, Clone)]
enum TempBase {
    Value(ValueBase),
    Remote(Arc<InterfaceDef>),
}

impl PartialEq for TempBase {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TempBase::Value(a), TempBase::Value(b)) => a == b,
            (TempBase::Remote(a), TempBase::Remote(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for TempBase {}

impl Hash for TempBase {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            TempBase::Value(v) => {
                0u8.hash(state);
                v.hash(state);
            }
            TempBase::Remote(def) => {
                1u8.hash(state);
                (Arc::as_ptr(def) as usize).hash(state);
            }
        }
    }
}

impl TempParam {
    fn from_type(ty: &TypeRef) -> Self {
        let (elem, dims) = ty.peel();
        let base = match elem {
            TypeRef::Primitive(p) => TempBase::Value(ValueBase::Primitive(*p)),
            TypeRef::Boxed(p) => TempBase::Value(ValueBase::Boxed(*p)),
            TypeRef::Str => TempBase::Value(ValueBase::Str),
            TypeRef::Class(class) => TempBase::Value(ValueBase::Class(class.clone())),
            TypeRef::Iface(def) => TempBase::Remote(def.clone()),
            TypeRef::Array(_) => unreachable!("peel strips array nesting"),
        };
        let unshared = match &base {
            TempBase::Value(v) => v.unshared_eligible(),
            TempBase::Remote(_) => true,
        };
        Self {
            base,
            dims,
            unshared,
        }
    }

    fn render(&self) -> String {
        let mut out = match &self.base {
            TempBase::Value(v) => v.to_string(),
            TempBase::Remote(def) => def.name().to_string(),
        };
        for _ in 0..self.dims {
            out.push_str("[]");
        }
        out
    }
}

/// Accumulated method state between merge and resolve.
#[derive(Debug, Clone)]
struct ProvisionalMethod {
    id: Identifier,
    name: Arc<str>,
    /// Declaring interface, for diagnostics only.
    declared_in: Arc<str>,
    ret: Option<TempParam>,
    params: Vec<TempParam>,
    throws: Vec<Arc<ClassDef>>,
    attrs: MethodAttrs,
}

impl ProvisionalMethod {
    fn build(
        declared_in: Arc<str>,
        method: &MethodDef,
        params: Vec<TempParam>,
        ret: Option<TempParam>,
        attrs: MethodAttrs,
        id: Option<Identifier>,
    ) -> Self {
        let mut throws: Vec<Arc<ClassDef>> = Vec::new();
        for class in &method.throws {
            if !throws.contains(class) {
                throws.push(class.clone());
            }
        }
        Self {
            id: id.unwrap_or_else(Identifier::next),
            name: method.name.clone(),
            declared_in,
            ret,
            params,
            throws,
            attrs,
        }
    }

    /// Structural equality, ignoring identity and the declaring interface.
    fn same_shape(&self, other: &Self) -> bool {
        self.name == other.name
            && self.params == other.params
            && self.ret == other.ret
            && self.throws == other.throws
            && self.attrs == other.attrs
    }

    /// True if some declared exception is `class` or a supertype of it.
    fn declares(&self, class: &ClassDef) -> bool {
        self.throws.iter().any(|d| d.is_assignable_from(class))
    }

    /// Merge a duplicate inherited through another parent. Behavioral flags
    /// must agree; the throws sets are mutually intersected, keeping an
    /// exception only when both sides declare it or a supertype of it.
    fn intersect(&self, other: &Self) -> Result<Self, IntrospectError> {
        debug_assert_eq!(self.name, other.name);
        debug_assert_eq!(self.id, other.id);
        debug_assert_eq!(self.params, other.params);

        if self.attrs.idempotent != other.attrs.idempotent {
            return Err(self.conflict("idempotent", other));
        }
        if self.attrs.asynchronous != other.attrs.asynchronous {
            return Err(self.conflict("asynchronous", other));
        }
        if self.attrs.response_timeout_ms != other.attrs.response_timeout_ms {
            return Err(self.conflict("response_timeout", other));
        }

        let mut subset: Vec<Arc<ClassDef>> = Vec::new();
        for class in self.throws.iter().chain(&other.throws) {
            if other.declares(class) && self.declares(class) && !subset.contains(class) {
                subset.push(class.clone());
            }
        }

        let mut merged = self.clone();
        merged.throws = subset;
        Ok(merged)
    }

    fn conflict(&self, annotation: &'static str, other: &Self) -> IntrospectError {
        IntrospectError::AnnotationConflict {
            annotation,
            left: self.signature(),
            right: other.signature(),
        }
    }

    fn signature(&self) -> String {
        let mut out = match &self.ret {
            Some(t) => t.render(),
            None => "void".to_string(),
        };
        out.push(' ');
        out.push_str(&self.declared_in);
        out.push('.');
        out.push_str(&self.name);
        out.push('(');
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&param.render());
        }
        out.push(')');
        if !self.throws.is_empty() {
            out.push_str(" throws ");
            for (i, class) in self.throws.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(class.name());
            }
        }
        out
    }
}

type MethodKey = (Arc<str>, Vec<TempParam>, Option<TempParam>);

impl IntrospectionContext {
    /// Examine a candidate remote interface, returning its descriptor
    /// handle. Answers from the cache when the interface was already
    /// examined; otherwise validates, merges inherited methods, publishes
    /// a provisional descriptor, and resolves it. A resolve failure removes
    /// the cache entry so later calls re-attempt introspection.
    pub fn examine(
        &mut self,
        def: &Arc<InterfaceDef>,
    ) -> Result<InterfaceHandle, IntrospectError> {
        if let Some(handle) = self.cache_get(def) {
            return Ok(handle);
        }

        self.validations += 1;
        if !self.annotations.supplies_response_timeout() && !self.warned_timeout {
            self.warned_timeout = true;
            warn!("annotation source does not supply response timeouts; treating them as unset");
        }

        if !def.is_interface() {
            return Err(IntrospectError::NotAnInterface {
                name: def.name().to_string(),
            });
        }
        if !def.is_public() {
            return Err(IntrospectError::NotPublic {
                name: def.name().to_string(),
            });
        }
        if !def.extends_remote() {
            return Err(IntrospectError::NotRemote {
                name: def.name().to_string(),
            });
        }

        let provisional = self.accumulate(def)?;

        let failure = well_known::remote_failure();
        for method in &provisional {
            if !method.declares(failure) {
                return Err(IntrospectError::MissingFailureThrow {
                    signature: method.signature(),
                });
            }
            if method.attrs.asynchronous {
                if method.ret.is_some() {
                    return Err(IntrospectError::AsyncReturnsValue {
                        signature: method.signature(),
                    });
                }
                for class in &method.throws {
                    if !class.is_assignable_from(failure) {
                        return Err(IntrospectError::AsyncForeignThrow {
                            signature: method.signature(),
                        });
                    }
                }
            }
        }

        let handle = self
            .arena
            .reserve_interface(Identifier::next(), def.name().clone());
        self.cache_put(def, handle);
        debug!(name = %def.name(), "published provisional interface descriptor");

        match self.resolve_all(provisional) {
            Ok(methods) => {
                let desc = InterfaceDescriptor::new(
                    self.arena.interface_id(handle),
                    def.name().clone(),
                    methods,
                );
                self.arena.finish_interface(handle, desc);
                Ok(handle)
            }
            Err(err) => {
                self.cache_remove(def, handle);
                Err(err)
            }
        }
    }

    /// `examine` for call sites holding an optional reference.
    pub fn examine_opt(
        &mut self,
        def: Option<&Arc<InterfaceDef>>,
    ) -> Result<InterfaceHandle, IntrospectError> {
        match def {
            Some(def) => self.examine(def),
            None => Err(IntrospectError::MissingInterface),
        }
    }

    /// Accumulate visible methods keyed by simple name and full signature,
    /// merging duplicates inherited through multiple parents.
    fn accumulate(
        &self,
        def: &Arc<InterfaceDef>,
    ) -> Result<Vec<ProvisionalMethod>, IntrospectError> {
        let mut order: Vec<ProvisionalMethod> = Vec::new();
        let mut index: FxHashMap<MethodKey, usize> = FxHashMap::default();

        for visible in def.visible_methods() {
            let method = visible.method;
            let params: Vec<TempParam> = method.params.iter().map(TempParam::from_type).collect();
            let ret = method.ret.as_ref().map(TempParam::from_type);
            let attrs = self.method_attrs(method);
            let key: MethodKey = (method.name.clone(), params.clone(), ret.clone());

            match index.get(&key) {
                None => {
                    index.insert(key, order.len());
                    order.push(ProvisionalMethod::build(
                        visible.declared_in,
                        method,
                        params,
                        ret,
                        attrs,
                        None,
                    ));
                }
                Some(&slot) => {
                    let candidate = ProvisionalMethod::build(
                        visible.declared_in,
                        method,
                        params,
                        ret,
                        attrs,
                        Some(order[slot].id),
                    );
                    if order[slot].same_shape(&candidate) {
                        continue;
                    }
                    order[slot] = order[slot].intersect(&candidate)?;
                }
            }
        }

        Ok(order)
    }

    fn method_attrs(&self, method: &MethodDef) -> MethodAttrs {
        let mut attrs = self.annotations.attrs(method);
        if !self.annotations.supplies_response_timeout() {
            attrs.response_timeout_ms = -1;
        }
        attrs
    }

    fn resolve_all(
        &mut self,
        provisional: Vec<ProvisionalMethod>,
    ) -> Result<Vec<MethodDescriptor>, IntrospectError> {
        provisional
            .into_iter()
            .map(|method| self.resolve_method(method))
            .collect()
    }

    fn resolve_method(
        &mut self,
        method: ProvisionalMethod,
    ) -> Result<MethodDescriptor, IntrospectError> {
        // The return is classified independently; its provisional flag holds.
        let ret = match &method.ret {
            Some(temp) => Some(self.resolve_param(temp.clone())?),
            None => None,
        };

        let mut temps = method.params;
        // If any parameter cannot be unshared, none can: a complex
        // serialized graph may reference any sibling or itself.
        let none_unshared = temps.iter().any(|p| !p.unshared);
        let mut params: SmallVec<[ParamId; 4]> = SmallVec::with_capacity(temps.len());
        for i in 0..temps.len() {
            let mut unshared = !none_unshared && temps[i].unshared;
            if unshared {
                // Only truly unshared when no later parameter shares the
                // serialized type; mark the later one while we are here.
                for j in (i + 1)..temps.len() {
                    if temps[j].base == temps[i].base {
                        unshared = false;
                        temps[j].unshared = false;
                        break;
                    }
                }
            }
            let mut temp = temps[i].clone();
            temp.unshared = unshared;
            params.push(self.resolve_param(temp)?);
        }

        let throws = method
            .throws
            .iter()
            .map(|class| {
                self.arena.intern(ParamDescriptor::Value {
                    ty: SerialType {
                        base: ValueBase::Class(class.clone()),
                        dims: 0,
                    },
                    unshared: false,
                })
            })
            .collect();

        Ok(MethodDescriptor {
            id: method.id,
            name: method.name,
            ret,
            params,
            throws,
            asynchronous: method.attrs.asynchronous,
            idempotent: method.attrs.idempotent,
            response_timeout_ms: method.attrs.response_timeout_ms,
        })
    }

    fn resolve_param(&mut self, temp: TempParam) -> Result<ParamId, IntrospectError> {
        match temp.base {
            TempBase::Remote(def) => {
                let iface = self.examine(&def)?;
                Ok(self.arena.intern(ParamDescriptor::Remote {
                    iface,
                    dims: temp.dims,
                    unshared: temp.unshared,
                }))
            }
            TempBase::Value(base) => Ok(self.arena.intern(ParamDescriptor::Value {
                ty: SerialType {
                    base,
                    dims: temp.dims,
                },
                unshared: temp.unshared,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remi_model::Primitive;

    #[test]
    fn temp_param_classification() {
        let t = TempParam::from_type(&TypeRef::Primitive(Primitive::I32));
        assert!(t.unshared);
        assert_eq!(t.dims, 0);

        let blob = ClassDef::serializable("demo.Blob");
        let t = TempParam::from_type(&TypeRef::array(TypeRef::Class(blob)));
        assert!(!t.unshared);
        assert_eq!(t.dims, 1);
        assert_eq!(t.render(), "demo.Blob[]");
    }

    #[test]
    fn remote_temp_params_compare_by_identity() {
        let marker = well_known::remote_marker();
        let a = InterfaceDef::builder("demo.Same").extend(marker).build();
        let b = InterfaceDef::builder("demo.Same").extend(marker).build();

        let ta = TempParam::from_type(&TypeRef::iface(&a));
        let tb = TempParam::from_type(&TypeRef::iface(&b));
        assert_ne!(ta, tb);
        assert_eq!(ta, ta.clone());
    }
}
