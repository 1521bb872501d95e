// global.rs
//
// Process-default introspection context. Examination runs under one
// reentrant monitor for the whole validate-merge-publish-resolve pass;
// reads of already-resolved descriptors go through `with_context` and do
// not observe partially resolved state.

use std::cell::RefCell;
use std::sync::{Arc, LazyLock};

use parking_lot::ReentrantMutex;

use remi_identity::InterfaceHandle;
use remi_introspect::{IntrospectError, IntrospectionContext};
use remi_model::InterfaceDef;

static CONTEXT: LazyLock<ReentrantMutex<RefCell<IntrospectionContext>>> =
    LazyLock::new(|| ReentrantMutex::new(RefCell::new(IntrospectionContext::new())));

/// Examine a candidate remote interface in the process-default context.
pub fn examine(def: &Arc<InterfaceDef>) -> Result<InterfaceHandle, IntrospectError> {
    with_context(|ctx| ctx.examine(def))
}

/// [`examine`] for call sites holding an optional reference.
pub fn examine_opt(def: Option<&Arc<InterfaceDef>>) -> Result<InterfaceHandle, IntrospectError> {
    with_context(|ctx| ctx.examine_opt(def))
}

/// Run `f` with exclusive access to the process-default context.
///
/// The monitor is reentrant per thread, but the context itself is borrowed
/// for the duration of `f`; do not call back into this module from inside.
pub fn with_context<R>(f: impl FnOnce(&mut IntrospectionContext) -> R) -> R {
    let guard = CONTEXT.lock();
    let mut ctx = guard.borrow_mut();
    f(&mut ctx)
}
