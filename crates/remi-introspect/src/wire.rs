// wire.rs
//
// Serialized form of descriptor graphs. Encoding flattens the transitive
// closure of reachable interfaces into an indexed catalog, so cyclic
// references are plain table indices. Decoding re-interns every parameter
// through the receiving context's canonical set and reuses any interface
// already adopted under the same wire identifier, which keeps equal
// descriptors identity-equal within a process.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use remi_identity::{Identifier, InterfaceHandle, ParamId};
use remi_model::{ClassDef, Primitive};

use crate::context::IntrospectionContext;
use crate::errors::IntrospectError;
use crate::iface::InterfaceDescriptor;
use crate::method::MethodDescriptor;
use crate::param::{ParamDescriptor, SerialType, ValueBase};

#[derive(Debug, Serialize, Deserialize)]
struct WireCatalog {
    root: u32,
    interfaces: Vec<WireInterface>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireInterface {
    id: u64,
    name: String,
    methods: Vec<WireMethod>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMethod {
    id: u64,
    name: String,
    ret: Option<WireParam>,
    params: Vec<WireParam>,
    throws: Vec<WireParam>,
    asynchronous: bool,
    idempotent: bool,
    response_timeout_ms: i64,
}

#[derive(Debug, Serialize, Deserialize)]
enum WireParam {
    Value {
        base: WireBase,
        dims: u8,
        unshared: bool,
    },
    Remote {
        iface: u32,
        dims: u8,
        unshared: bool,
    },
}

#[derive(Debug, Serialize, Deserialize)]
enum WireBase {
    Primitive(Primitive),
    Boxed(Primitive),
    Str,
    /// Supertype chain from the class itself up to its root.
    Class(Vec<WireClass>),
}

#[derive(Debug, Serialize, Deserialize)]
struct WireClass {
    name: String,
    throwable: bool,
}

/// Serialize the interface behind `root` together with every interface its
/// methods transitively reference.
pub fn encode_interface(
    ctx: &IntrospectionContext,
    root: InterfaceHandle,
) -> Result<Vec<u8>, IntrospectError> {
    let mut order: Vec<InterfaceHandle> = Vec::new();
    let mut index: FxHashMap<InterfaceHandle, u32> = FxHashMap::default();
    let mut work: Vec<InterfaceHandle> = vec![root];

    while let Some(handle) = work.pop() {
        if index.contains_key(&handle) {
            continue;
        }
        index.insert(handle, order.len() as u32);
        order.push(handle);

        let desc = ctx.arena().try_interface(handle).ok_or_else(|| {
            IntrospectError::CatalogEncode {
                detail: format!("interface {} is not resolved", ctx.arena().interface_name(handle)),
            }
        })?;
        for method in desc.methods() {
            let positions = method
                .params()
                .iter()
                .copied()
                .chain(method.return_type())
                .chain(method.throws().iter().copied());
            for id in positions {
                if let Some(referenced) = ctx.param(id).remote_type() {
                    work.push(referenced);
                }
            }
        }
    }

    let interfaces = order
        .iter()
        .map(|&handle| {
            let desc = ctx.arena().interface(handle);
            WireInterface {
                id: desc.id().raw(),
                name: desc.name().to_string(),
                methods: desc
                    .methods()
                    .iter()
                    .map(|method| encode_method(ctx, &index, method))
                    .collect(),
            }
        })
        .collect();

    let catalog = WireCatalog {
        root: index[&root],
        interfaces,
    };
    bincode::serialize(&catalog).map_err(|err| IntrospectError::CatalogEncode {
        detail: err.to_string(),
    })
}

/// Adopt a serialized descriptor graph into this context. The returned
/// root is retained until `release`d.
pub fn decode_interface(
    ctx: &mut IntrospectionContext,
    bytes: &[u8],
) -> Result<InterfaceHandle, IntrospectError> {
    let catalog: WireCatalog =
        bincode::deserialize(bytes).map_err(|err| IntrospectError::CatalogDecode {
            detail: err.to_string(),
        })?;
    if catalog.root as usize >= catalog.interfaces.len() {
        return Err(IntrospectError::CatalogDecode {
            detail: format!("root index {} out of range", catalog.root),
        });
    }

    // First pass: give every table entry a handle, reusing interfaces this
    // context already knows under the same identifier.
    let mut handles: Vec<InterfaceHandle> = Vec::with_capacity(catalog.interfaces.len());
    let mut created: Vec<usize> = Vec::new();
    for (slot, wire) in catalog.interfaces.iter().enumerate() {
        let id = Identifier::from_raw(wire.id);
        match ctx.handle_by_identifier(id) {
            Some(existing) => handles.push(existing),
            None => {
                let handle = ctx.arena.reserve_interface(id, wire.name.as_str().into());
                handles.push(handle);
                created.push(slot);
            }
        }
    }

    // Second pass: fill in the newly created interfaces.
    let result = (|| {
        for &slot in &created {
            let wire = &catalog.interfaces[slot];
            let methods = wire
                .methods
                .iter()
                .map(|method| decode_method(ctx, &handles, method))
                .collect::<Result<Vec<_>, _>>()?;
            let handle = handles[slot];
            let desc = InterfaceDescriptor::new(
                Identifier::from_raw(wire.id),
                wire.name.as_str().into(),
                methods,
            );
            ctx.arena.finish_interface(handle, desc);
            ctx.adopt(handle);
        }
        Ok(())
    })();

    if let Err(err) = result {
        for &slot in &created {
            ctx.by_identifier
                .remove(&Identifier::from_raw(catalog.interfaces[slot].id));
            ctx.arena.remove_interface(handles[slot]);
        }
        return Err(err);
    }

    let root = handles[catalog.root as usize];
    ctx.retain_root(root);
    Ok(root)
}

fn encode_method(
    ctx: &IntrospectionContext,
    index: &FxHashMap<InterfaceHandle, u32>,
    method: &MethodDescriptor,
) -> WireMethod {
    WireMethod {
        id: method.id().raw(),
        name: method.name().to_string(),
        ret: method.return_type().map(|id| encode_param(ctx, index, id)),
        params: method
            .params()
            .iter()
            .map(|&id| encode_param(ctx, index, id))
            .collect(),
        throws: method
            .throws()
            .iter()
            .map(|&id| encode_param(ctx, index, id))
            .collect(),
        asynchronous: method.is_asynchronous(),
        idempotent: method.is_idempotent(),
        response_timeout_ms: method.response_timeout_ms(),
    }
}

fn encode_param(
    ctx: &IntrospectionContext,
    index: &FxHashMap<InterfaceHandle, u32>,
    id: ParamId,
) -> WireParam {
    match ctx.param(id) {
        ParamDescriptor::Value { ty, unshared } => WireParam::Value {
            base: encode_base(&ty.base),
            dims: ty.dims,
            unshared: *unshared,
        },
        ParamDescriptor::Remote {
            iface,
            dims,
            unshared,
        } => WireParam::Remote {
            iface: index[iface],
            dims: *dims,
            unshared: *unshared,
        },
    }
}

fn encode_base(base: &ValueBase) -> WireBase {
    match base {
        ValueBase::Primitive(p) => WireBase::Primitive(*p),
        ValueBase::Boxed(p) => WireBase::Boxed(*p),
        ValueBase::Str => WireBase::Str,
        ValueBase::Class(class) => {
            let mut chain = Vec::new();
            let mut cur = Some(class.clone());
            while let Some(c) = cur {
                chain.push(WireClass {
                    name: c.name().to_string(),
                    throwable: c.is_throwable(),
                });
                cur = c.parent().cloned();
            }
            WireBase::Class(chain)
        }
    }
}

fn decode_method(
    ctx: &mut IntrospectionContext,
    handles: &[InterfaceHandle],
    wire: &WireMethod,
) -> Result<MethodDescriptor, IntrospectError> {
    let ret = wire
        .ret
        .as_ref()
        .map(|param| decode_param(ctx, handles, param))
        .transpose()?;
    let params = wire
        .params
        .iter()
        .map(|param| decode_param(ctx, handles, param))
        .collect::<Result<SmallVec<[ParamId; 4]>, _>>()?;
    let throws = wire
        .throws
        .iter()
        .map(|param| decode_param(ctx, handles, param))
        .collect::<Result<SmallVec<[ParamId; 2]>, _>>()?;

    Ok(MethodDescriptor {
        id: Identifier::from_raw(wire.id),
        name: wire.name.as_str().into(),
        ret,
        params,
        throws,
        asynchronous: wire.asynchronous,
        idempotent: wire.idempotent,
        response_timeout_ms: wire.response_timeout_ms,
    })
}

fn decode_param(
    ctx: &mut IntrospectionContext,
    handles: &[InterfaceHandle],
    wire: &WireParam,
) -> Result<ParamId, IntrospectError> {
    let descriptor = match wire {
        WireParam::Value {
            base,
            dims,
            unshared,
        } => ParamDescriptor::Value {
            ty: SerialType {
                base: decode_base(base)?,
                dims: *dims,
            },
            unshared: *unshared,
        },
        WireParam::Remote {
            iface,
            dims,
            unshared,
        } => {
            let handle = handles.get(*iface as usize).copied().ok_or_else(|| {
                IntrospectError::CatalogDecode {
                    detail: format!("interface index {iface} out of range"),
                }
            })?;
            ParamDescriptor::Remote {
                iface: handle,
                dims: *dims,
                unshared: *unshared,
            }
        }
    };
    // The re-interning path: equal descriptors stay identity-equal here.
    Ok(ctx.intern(descriptor))
}

fn decode_base(base: &WireBase) -> Result<ValueBase, IntrospectError> {
    Ok(match base {
        WireBase::Primitive(p) => ValueBase::Primitive(*p),
        WireBase::Boxed(p) => ValueBase::Boxed(*p),
        WireBase::Str => ValueBase::Str,
        WireBase::Class(chain) => {
            if chain.is_empty() {
                return Err(IntrospectError::CatalogDecode {
                    detail: "empty class chain".to_string(),
                });
            }
            let mut parent: Option<std::sync::Arc<ClassDef>> = None;
            for link in chain.iter().rev() {
                parent = Some(ClassDef::new(
                    link.name.as_str(),
                    parent.take(),
                    link.throwable,
                ));
            }
            ValueBase::Class(parent.expect("chain is non-empty"))
        }
    })
}
