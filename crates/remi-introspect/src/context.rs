// context.rs
//
// The introspection context owns the two process-wide stores: the
// weak-keyed interface cache and the parameter canonical set (both backed
// by the descriptor arena). All mutation funnels through `&mut self`;
// descriptor fields are effectively immutable once resolve returns.

use std::sync::{Arc, Weak};

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use remi_identity::{Identifier, InterfaceHandle, ParamId};
use remi_model::{AnnotationSource, DeclaredAnnotations, InterfaceDef};

use crate::arena::DescriptorArena;
use crate::iface::InterfaceDescriptor;
use crate::param::ParamDescriptor;

struct CacheEntry {
    /// Liveness of the source definition; a dead entry is unreachable by
    /// lookup (the key address may be reused) and reclaimed by `purge`.
    key: Weak<InterfaceDef>,
    handle: InterfaceHandle,
}

/// Owner of descriptor storage and the interface cache.
///
/// A context is the unit of canonicalization: equal descriptors interned
/// through one context share handles. Callers that want the process-wide
/// behavior of the original runtime use the default context in the facade
/// crate; tests and embedders construct their own.
pub struct IntrospectionContext {
    pub(crate) arena: DescriptorArena,
    /// Source-definition address -> cache entry. Identity keyed: two equal
    /// but distinct definitions introspect separately.
    cache: FxHashMap<usize, CacheEntry>,
    /// Wire identity -> handle, for adopting serialized descriptors.
    pub(crate) by_identifier: FxHashMap<Identifier, InterfaceHandle>,
    /// Roots adopted from the wire; kept live until released.
    retained: FxHashSet<InterfaceHandle>,
    pub(crate) annotations: Box<dyn AnnotationSource>,
    pub(crate) validations: u64,
    pub(crate) warned_timeout: bool,
}

impl IntrospectionContext {
    pub fn new() -> Self {
        Self::with_annotations(Box::new(DeclaredAnnotations))
    }

    pub fn with_annotations(annotations: Box<dyn AnnotationSource>) -> Self {
        Self {
            arena: DescriptorArena::new(),
            cache: FxHashMap::default(),
            by_identifier: FxHashMap::default(),
            retained: FxHashSet::default(),
            annotations,
            validations: 0,
            warned_timeout: false,
        }
    }

    pub fn arena(&self) -> &DescriptorArena {
        &self.arena
    }

    /// The resolved descriptor for a handle.
    pub fn interface(&self, handle: InterfaceHandle) -> &InterfaceDescriptor {
        self.arena.interface(handle)
    }

    pub fn param(&self, id: ParamId) -> &ParamDescriptor {
        self.arena.param(id)
    }

    /// Intern a descriptor, returning the canonical handle.
    pub fn intern(&mut self, param: ParamDescriptor) -> ParamId {
        self.arena.intern(param)
    }

    /// Canonical handle for the same descriptor with the requested flag.
    pub fn with_unshared(&mut self, id: ParamId, unshared: bool) -> ParamId {
        self.arena.with_unshared(id, unshared)
    }

    /// How many validation passes have run; repeated examination of a
    /// cached interface does not revalidate.
    pub fn validations(&self) -> u64 {
        self.validations
    }

    pub(crate) fn cache_get(&self, def: &Arc<InterfaceDef>) -> Option<InterfaceHandle> {
        let key = Arc::as_ptr(def) as usize;
        let entry = self.cache.get(&key)?;
        // A dead weak means the address was freed and possibly reused;
        // never answer from such an entry.
        let live = entry.key.upgrade()?;
        if Arc::ptr_eq(&live, def) {
            Some(entry.handle)
        } else {
            None
        }
    }

    pub(crate) fn cache_put(&mut self, def: &Arc<InterfaceDef>, handle: InterfaceHandle) {
        let key = Arc::as_ptr(def) as usize;
        self.cache.insert(
            key,
            CacheEntry {
                key: Arc::downgrade(def),
                handle,
            },
        );
        self.by_identifier
            .insert(self.arena.interface_id(handle), handle);
    }

    /// Unpublish a descriptor whose resolve failed. The arena slot itself
    /// is left in place: a nested interface that resolved before the
    /// failure may already hold the handle, and `purge` reclaims the slot
    /// once nothing references it.
    pub(crate) fn cache_remove(&mut self, def: &Arc<InterfaceDef>, handle: InterfaceHandle) {
        let key = Arc::as_ptr(def) as usize;
        self.cache.remove(&key);
        self.by_identifier.remove(&self.arena.interface_id(handle));
    }

    pub(crate) fn handle_by_identifier(&self, id: Identifier) -> Option<InterfaceHandle> {
        self.by_identifier.get(&id).copied()
    }

    pub(crate) fn adopt(&mut self, handle: InterfaceHandle) {
        self.by_identifier
            .insert(self.arena.interface_id(handle), handle);
    }

    pub(crate) fn retain_root(&mut self, handle: InterfaceHandle) {
        self.retained.insert(handle);
    }

    /// Release a wire-adopted root so `purge` may reclaim it.
    pub fn release(&mut self, handle: InterfaceHandle) {
        self.retained.remove(&handle);
    }

    /// Reclaim descriptors whose source definitions have been dropped.
    ///
    /// Cache entries with dead keys are removed; every interface slot still
    /// reachable from a live entry or a retained wire root survives, along
    /// with every parameter those interfaces mention. Referenced interfaces
    /// are kept alive by their referrers (strong chains), matching the
    /// lifecycle a weak-keyed map with tracing collection would give.
    pub fn purge(&mut self) {
        self.cache.retain(|_, entry| entry.key.upgrade().is_some());

        let mut keep_interfaces: FxHashSet<InterfaceHandle> = FxHashSet::default();
        let mut stack: Vec<InterfaceHandle> = self
            .cache
            .values()
            .map(|entry| entry.handle)
            .chain(self.retained.iter().copied())
            .collect();
        while let Some(handle) = stack.pop() {
            if !keep_interfaces.insert(handle) {
                continue;
            }
            if let Some(desc) = self.arena.try_interface(handle) {
                for method in desc.methods() {
                    let positions = method
                        .params()
                        .iter()
                        .copied()
                        .chain(method.return_type())
                        .chain(method.throws().iter().copied());
                    for id in positions {
                        if let Some(referenced) = self.arena.param(id).remote_type() {
                            stack.push(referenced);
                        }
                    }
                }
            }
        }

        let mut keep_params: FxHashSet<ParamId> = FxHashSet::default();
        for &handle in &keep_interfaces {
            if let Some(desc) = self.arena.try_interface(handle) {
                for method in desc.methods() {
                    keep_params.extend(method.params().iter().copied());
                    keep_params.extend(method.return_type());
                    keep_params.extend(method.throws().iter().copied());
                }
            }
        }

        let dropped = self
            .by_identifier
            .values()
            .filter(|handle| !keep_interfaces.contains(*handle))
            .count();
        if dropped > 0 {
            debug!(dropped, "purged unreferenced interface descriptors");
        }
        self.by_identifier
            .retain(|_, handle| keep_interfaces.contains(handle));
        self.arena.sweep(&keep_interfaces, &keep_params);
    }
}

impl Default for IntrospectionContext {
    fn default() -> Self {
        Self::new()
    }
}
