// arena.rs
//
// Descriptor storage with automatic interning and stable handles.
//
// Interface descriptors live in handle-indexed slots so that cyclic method
// graphs terminate at a handle comparison: a slot is reserved (and its
// handle is valid in signatures) before the descriptor is resolved.
// Parameter descriptors are deduplicated through an intern map; equal
// structures share one ParamId.

use hashbrown::HashMap;

use remi_identity::{Identifier, InterfaceHandle, ParamId};

use crate::iface::InterfaceDescriptor;
use crate::param::ParamDescriptor;

#[derive(Debug)]
pub(crate) enum InterfaceSlot {
    /// Reserved at publish time; methods are still being resolved.
    Provisional { id: Identifier, name: std::sync::Arc<str> },
    Resolved(InterfaceDescriptor),
}

/// Per-context storage for interned descriptors.
#[derive(Debug, Default)]
pub struct DescriptorArena {
    interfaces: Vec<Option<InterfaceSlot>>,
    free_interfaces: Vec<InterfaceHandle>,
    params: Vec<Option<ParamDescriptor>>,
    free_params: Vec<ParamId>,
    param_map: HashMap<ParamDescriptor, ParamId>,
}

impl DescriptorArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a parameter descriptor, returning the canonical handle.
    pub fn intern(&mut self, param: ParamDescriptor) -> ParamId {
        if let Some(&id) = self.param_map.get(&param) {
            return id;
        }
        let id = match self.free_params.pop() {
            Some(id) => {
                self.params[id.index() as usize] = Some(param.clone());
                id
            }
            None => {
                let id = ParamId::new(self.params.len() as u32);
                self.params.push(Some(param.clone()));
                id
            }
        };
        self.param_map.insert(param, id);
        id
    }

    /// The canonical descriptor for a handle. Panics on a stale handle.
    pub fn param(&self, id: ParamId) -> &ParamDescriptor {
        self.params[id.index() as usize]
            .as_ref()
            .expect("stale parameter handle")
    }

    /// Canonical handle for the same descriptor with the requested flag.
    pub fn with_unshared(&mut self, id: ParamId, unshared: bool) -> ParamId {
        let current = self.param(id);
        if current.is_unshared() == unshared {
            return id;
        }
        let flipped = current.to_unshared(unshared);
        self.intern(flipped)
    }

    pub(crate) fn reserve_interface(
        &mut self,
        id: Identifier,
        name: std::sync::Arc<str>,
    ) -> InterfaceHandle {
        let slot = InterfaceSlot::Provisional { id, name };
        match self.free_interfaces.pop() {
            Some(handle) => {
                self.interfaces[handle.index() as usize] = Some(slot);
                handle
            }
            None => {
                let handle = InterfaceHandle::new(self.interfaces.len() as u32);
                self.interfaces.push(Some(slot));
                handle
            }
        }
    }

    pub(crate) fn finish_interface(&mut self, handle: InterfaceHandle, desc: InterfaceDescriptor) {
        let slot = &mut self.interfaces[handle.index() as usize];
        debug_assert!(matches!(slot, Some(InterfaceSlot::Provisional { .. })));
        *slot = Some(InterfaceSlot::Resolved(desc));
    }

    pub(crate) fn remove_interface(&mut self, handle: InterfaceHandle) {
        self.interfaces[handle.index() as usize] = None;
        self.free_interfaces.push(handle);
    }

    /// The resolved descriptor for a handle. Panics if the handle is stale
    /// or the interface is still resolving.
    pub fn interface(&self, handle: InterfaceHandle) -> &InterfaceDescriptor {
        match self.try_interface(handle) {
            Some(desc) => desc,
            None => panic!("interface handle {:?} is not resolved", handle),
        }
    }

    /// The resolved descriptor, or None while provisional or after eviction.
    pub fn try_interface(&self, handle: InterfaceHandle) -> Option<&InterfaceDescriptor> {
        match self.interfaces.get(handle.index() as usize)? {
            Some(InterfaceSlot::Resolved(desc)) => Some(desc),
            _ => None,
        }
    }

    /// Interface name, available from reservation onward.
    pub fn interface_name(&self, handle: InterfaceHandle) -> &std::sync::Arc<str> {
        match &self.interfaces[handle.index() as usize] {
            Some(InterfaceSlot::Provisional { name, .. }) => name,
            Some(InterfaceSlot::Resolved(desc)) => desc.name(),
            None => panic!("stale interface handle"),
        }
    }

    /// Interface identifier, available from reservation onward.
    pub fn interface_id(&self, handle: InterfaceHandle) -> Identifier {
        match &self.interfaces[handle.index() as usize] {
            Some(InterfaceSlot::Provisional { id, .. }) => *id,
            Some(InterfaceSlot::Resolved(desc)) => desc.id(),
            None => panic!("stale interface handle"),
        }
    }

    /// Drop every descriptor not in the keep sets. Called by the owning
    /// context after it has marked reachability from live cache roots.
    pub(crate) fn sweep(
        &mut self,
        keep_interfaces: &rustc_hash::FxHashSet<InterfaceHandle>,
        keep_params: &rustc_hash::FxHashSet<ParamId>,
    ) {
        for index in 0..self.interfaces.len() {
            let handle = InterfaceHandle::new(index as u32);
            if self.interfaces[index].is_some() && !keep_interfaces.contains(&handle) {
                self.interfaces[index] = None;
                self.free_interfaces.push(handle);
            }
        }
        for index in 0..self.params.len() {
            let id = ParamId::new(index as u32);
            if !keep_params.contains(&id) {
                if let Some(param) = self.params[index].take() {
                    self.param_map.remove(&param);
                    self.free_params.push(id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::{SerialType, ValueBase};
    use remi_model::Primitive;

    fn value(p: Primitive, unshared: bool) -> ParamDescriptor {
        ParamDescriptor::Value {
            ty: SerialType {
                base: ValueBase::Primitive(p),
                dims: 0,
            },
            unshared,
        }
    }

    #[test]
    fn interning_deduplicates() {
        let mut arena = DescriptorArena::new();
        let a = arena.intern(value(Primitive::I32, true));
        let b = arena.intern(value(Primitive::I32, true));
        assert_eq!(a, b);
    }

    #[test]
    fn different_descriptors_different_ids() {
        let mut arena = DescriptorArena::new();
        let a = arena.intern(value(Primitive::I32, true));
        let b = arena.intern(value(Primitive::I64, true));
        assert_ne!(a, b);
    }

    #[test]
    fn with_unshared_returns_canonical_instance() {
        let mut arena = DescriptorArena::new();
        let shared = arena.intern(value(Primitive::I32, false));
        let unshared = arena.intern(value(Primitive::I32, true));

        assert_eq!(arena.with_unshared(shared, true), unshared);
        assert_eq!(arena.with_unshared(unshared, true), unshared);
        assert_eq!(arena.with_unshared(unshared, false), shared);
    }

    #[test]
    fn reserved_interface_exposes_name_and_id() {
        let mut arena = DescriptorArena::new();
        let id = Identifier::next();
        let handle = arena.reserve_interface(id, "demo.Calc".into());

        assert_eq!(arena.interface_id(handle), id);
        assert_eq!(&**arena.interface_name(handle), "demo.Calc");
        assert!(arena.try_interface(handle).is_none());
    }

    #[test]
    fn removed_slot_is_reused() {
        let mut arena = DescriptorArena::new();
        let first = arena.reserve_interface(Identifier::next(), "demo.A".into());
        arena.remove_interface(first);
        let second = arena.reserve_interface(Identifier::next(), "demo.B".into());
        assert_eq!(first, second);
    }
}
