// iface.rs

use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use remi_identity::{Identifier, ParamId};

use crate::errors::NoSuchMethod;
use crate::method::MethodDescriptor;

/// All metadata of one remote interface: its methods in first-seen order,
/// indexed lazily by name and by method identifier.
///
/// Equality is `(name, id, methods)`; the memoized indices are derived and
/// ignored. Remote references inside methods are arena handles, so equality
/// of cyclic descriptor graphs terminates at a handle comparison instead of
/// walking the cycle.
#[derive(Debug)]
pub struct InterfaceDescriptor {
    id: Identifier,
    name: Arc<str>,
    methods: Vec<MethodDescriptor>,
    by_name: OnceLock<FxHashMap<Arc<str>, SmallVec<[u32; 2]>>>,
    by_id: OnceLock<FxHashMap<Identifier, u32>>,
}

impl InterfaceDescriptor {
    pub(crate) fn new(id: Identifier, name: Arc<str>, methods: Vec<MethodDescriptor>) -> Self {
        Self {
            id,
            name,
            methods,
            by_name: OnceLock::new(),
            by_id: OnceLock::new(),
        }
    }

    pub fn id(&self) -> Identifier {
        self.id
    }

    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    /// Methods in first-seen order.
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    /// All methods sharing a simple name (overloads).
    pub fn methods_by_name<'a>(
        &'a self,
        name: &str,
    ) -> impl Iterator<Item = &'a MethodDescriptor> {
        let index = self.by_name.get_or_init(|| {
            let mut map: FxHashMap<Arc<str>, SmallVec<[u32; 2]>> = FxHashMap::default();
            for (i, method) in self.methods.iter().enumerate() {
                map.entry(method.name().clone()).or_default().push(i as u32);
            }
            map
        });
        index
            .get(name)
            .map(|slots| slots.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(|&i| &self.methods[i as usize])
    }

    /// Look up a method by its wire identifier.
    pub fn method_by_id(&self, id: Identifier) -> Result<&MethodDescriptor, NoSuchMethod> {
        let index = self.by_id.get_or_init(|| {
            self.methods
                .iter()
                .enumerate()
                .map(|(i, method)| (method.id(), i as u32))
                .collect()
        });
        index
            .get(&id)
            .map(|&i| &self.methods[i as usize])
            .ok_or_else(|| NoSuchMethod {
                key: format!("method id {id}"),
            })
    }

    /// Look up a method by name and exact, order-sensitive parameter
    /// descriptors.
    pub fn find_method(
        &self,
        name: &str,
        params: &[ParamId],
    ) -> Result<&MethodDescriptor, NoSuchMethod> {
        self.methods_by_name(name)
            .find(|method| method.params() == params)
            .ok_or_else(|| NoSuchMethod {
                key: name.to_string(),
            })
    }
}

impl PartialEq for InterfaceDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.name == other.name && self.methods == other.methods
    }
}

impl Eq for InterfaceDescriptor {}

impl Hash for InterfaceDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.id.hash(state);
    }
}
