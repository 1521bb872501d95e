// iface.rs
//
// Candidate interface and method definitions. Method lists are sealed after
// construction through `define` so that an `Arc<InterfaceDef>` can exist
// before any signature mentions it; self-referential and mutually
// referential interfaces need the handle first.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use crate::types::{ClassDef, MethodAttrs, TypeRef};
use crate::well_known;

/// Reflective view of one candidate interface.
#[derive(Debug)]
pub struct InterfaceDef {
    name: Arc<str>,
    public: bool,
    interface: bool,
    extends: Vec<Arc<InterfaceDef>>,
    methods: OnceLock<Vec<MethodDef>>,
}

impl InterfaceDef {
    pub fn builder(name: impl Into<Arc<str>>) -> InterfaceBuilder {
        InterfaceBuilder {
            name: name.into(),
            public: true,
            interface: true,
            extends: Vec::new(),
        }
    }

    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn is_interface(&self) -> bool {
        self.interface
    }

    pub fn extends(&self) -> &[Arc<InterfaceDef>] {
        &self.extends
    }

    /// Seal the method list. Panics on redefinition; a definition source
    /// must supply each interface's methods exactly once.
    pub fn define(&self, methods: Vec<MethodDef>) {
        if self.methods.set(methods).is_err() {
            panic!("methods already defined for interface {}", self.name);
        }
    }

    /// Declared methods, or the empty slice while still undefined.
    pub fn methods(&self) -> &[MethodDef] {
        self.methods.get().map(Vec::as_slice).unwrap_or(&[])
    }

    /// True if this interface transitively extends the remote marker
    /// (or is the marker itself).
    pub fn extends_remote(self: &Arc<Self>) -> bool {
        if Arc::ptr_eq(self, well_known::remote_marker()) {
            return true;
        }
        self.extends.iter().any(InterfaceDef::extends_remote)
    }

    /// All methods visible on this interface: declared first, then parents
    /// depth-first, in a stable order. Methods declared on non-interface
    /// roots are skipped; duplicate signatures inherited from multiple
    /// parents are kept (the introspector merges them). Each definition in
    /// a diamond is visited once.
    pub fn visible_methods(&self) -> Vec<VisibleMethod<'_>> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        self.collect_visible(&mut out, &mut seen);
        out
    }

    fn collect_visible<'a>(
        &'a self,
        out: &mut Vec<VisibleMethod<'a>>,
        seen: &mut HashSet<*const InterfaceDef>,
    ) {
        if !seen.insert(self as *const InterfaceDef) {
            return;
        }
        if self.interface {
            for method in self.methods() {
                out.push(VisibleMethod {
                    declared_in: self.name.clone(),
                    method,
                });
            }
        }
        for parent in &self.extends {
            parent.collect_visible(out, seen);
        }
    }
}

/// A method together with the interface that declared it, for diagnostics.
#[derive(Debug)]
pub struct VisibleMethod<'a> {
    pub declared_in: Arc<str>,
    pub method: &'a MethodDef,
}

pub struct InterfaceBuilder {
    name: Arc<str>,
    public: bool,
    interface: bool,
    extends: Vec<Arc<InterfaceDef>>,
}

impl InterfaceBuilder {
    pub fn non_public(mut self) -> Self {
        self.public = false;
        self
    }

    /// Mark this definition as a concrete class rather than an interface.
    pub fn class(mut self) -> Self {
        self.interface = false;
        self
    }

    pub fn extend(mut self, parent: &Arc<InterfaceDef>) -> Self {
        self.extends.push(parent.clone());
        self
    }

    pub fn build(self) -> Arc<InterfaceDef> {
        Arc::new(InterfaceDef {
            name: self.name,
            public: self.public,
            interface: self.interface,
            extends: self.extends,
            methods: OnceLock::new(),
        })
    }
}

/// One declared method of a candidate interface.
#[derive(Debug, Clone)]
pub struct MethodDef {
    pub name: Arc<str>,
    pub params: Vec<TypeRef>,
    /// None is void.
    pub ret: Option<TypeRef>,
    pub throws: Vec<Arc<ClassDef>>,
    pub attrs: MethodAttrs,
}

/// Start building a method definition.
pub fn method(name: impl Into<Arc<str>>) -> MethodBuilder {
    MethodBuilder {
        def: MethodDef {
            name: name.into(),
            params: Vec::new(),
            ret: None,
            throws: Vec::new(),
            attrs: MethodAttrs::default(),
        },
    }
}

pub struct MethodBuilder {
    def: MethodDef,
}

impl MethodBuilder {
    pub fn param(mut self, ty: TypeRef) -> Self {
        self.def.params.push(ty);
        self
    }

    pub fn returns(mut self, ty: TypeRef) -> Self {
        self.def.ret = Some(ty);
        self
    }

    pub fn throws(mut self, class: &Arc<ClassDef>) -> Self {
        debug_assert!(class.is_throwable(), "throws clause requires a throwable class");
        self.def.throws.push(class.clone());
        self
    }

    pub fn asynchronous(mut self) -> Self {
        self.def.attrs.asynchronous = true;
        self
    }

    pub fn idempotent(mut self) -> Self {
        self.def.attrs.idempotent = true;
        self
    }

    pub fn response_timeout_ms(mut self, millis: i64) -> Self {
        self.def.attrs.response_timeout_ms = millis;
        self
    }

    pub fn build(self) -> MethodDef {
        self.def
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Primitive;

    #[test]
    fn extends_remote_is_transitive() {
        let marker = well_known::remote_marker();
        let base = InterfaceDef::builder("demo.Base").extend(marker).build();
        let leaf = InterfaceDef::builder("demo.Leaf").extend(&base).build();
        let stray = InterfaceDef::builder("demo.Stray").build();

        assert!(base.extends_remote());
        assert!(leaf.extends_remote());
        assert!(!stray.extends_remote());
    }

    #[test]
    fn visible_methods_declared_before_inherited() {
        let marker = well_known::remote_marker();
        let parent = InterfaceDef::builder("demo.Parent").extend(marker).build();
        parent.define(vec![method("ping").build()]);
        let child = InterfaceDef::builder("demo.Child").extend(&parent).build();
        child.define(vec![method("pong").build()]);

        let names: Vec<_> = child
            .visible_methods()
            .iter()
            .map(|v| v.method.name.to_string())
            .collect();
        assert_eq!(names, ["pong", "ping"]);
    }

    #[test]
    fn diamond_parents_visited_once() {
        let marker = well_known::remote_marker();
        let root = InterfaceDef::builder("demo.Root").extend(marker).build();
        root.define(vec![method("op").build()]);
        let a = InterfaceDef::builder("demo.A").extend(&root).build();
        let b = InterfaceDef::builder("demo.B").extend(&root).build();
        let c = InterfaceDef::builder("demo.C").extend(&a).extend(&b).build();

        let visible = c.visible_methods();
        assert_eq!(visible.len(), 1);
        assert_eq!(&*visible[0].declared_in, "demo.Root");
    }

    #[test]
    fn class_root_methods_are_not_visible() {
        let marker = well_known::remote_marker();
        let base = InterfaceDef::builder("demo.BaseImpl")
            .class()
            .extend(marker)
            .build();
        base.define(vec![method("local_only").build()]);
        let iface = InterfaceDef::builder("demo.Exposed").extend(&base).build();
        iface.define(vec![method("ping").build()]);

        let names: Vec<_> = iface
            .visible_methods()
            .iter()
            .map(|v| v.method.name.to_string())
            .collect();
        assert_eq!(names, ["ping"]);
    }

    #[test]
    fn self_referential_definition() {
        let marker = well_known::remote_marker();
        let link = InterfaceDef::builder("demo.Link").extend(marker).build();
        link.define(vec![method("next").returns(TypeRef::iface(&link)).build()]);

        let visible = link.visible_methods();
        assert_eq!(visible.len(), 1);
        match &visible[0].method.ret {
            Some(TypeRef::Iface(def)) => assert!(Arc::ptr_eq(def, &link)),
            other => panic!("expected interface return, got {other:?}"),
        }
    }

    #[test]
    fn method_builder_defaults() {
        let m = method("tick").param(TypeRef::Primitive(Primitive::I32)).build();
        assert!(!m.attrs.asynchronous);
        assert!(!m.attrs.idempotent);
        assert_eq!(m.attrs.response_timeout_ms, -1);
    }
}
