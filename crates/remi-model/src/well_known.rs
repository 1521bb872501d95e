//! Canonical well-known types.
//!
//! Looked up once and cached for fast identity comparison: the root remote
//! marker interface every candidate must transitively extend, and the
//! throwable chain ending in the mandatory remote failure.

use std::sync::{Arc, LazyLock};

use crate::iface::InterfaceDef;
use crate::types::ClassDef;

static REMOTE_MARKER: LazyLock<Arc<InterfaceDef>> = LazyLock::new(|| {
    let marker = InterfaceDef::builder("rmi.Remote").build();
    marker.define(Vec::new());
    marker
});

static THROWABLE_ROOT: LazyLock<Arc<ClassDef>> =
    LazyLock::new(|| ClassDef::exception("core.Throwable", None));

static IO_ERROR: LazyLock<Arc<ClassDef>> =
    LazyLock::new(|| ClassDef::exception("core.IoError", Some(THROWABLE_ROOT.clone())));

static REMOTE_FAILURE: LazyLock<Arc<ClassDef>> =
    LazyLock::new(|| ClassDef::exception("rmi.RemoteFailure", Some(IO_ERROR.clone())));

/// The root remote marker interface.
pub fn remote_marker() -> &'static Arc<InterfaceDef> {
    &REMOTE_MARKER
}

/// Root of the throwable chain.
pub fn throwable_root() -> &'static Arc<ClassDef> {
    &THROWABLE_ROOT
}

/// Transport-level I/O failure, below the throwable root.
pub fn io_error() -> &'static Arc<ClassDef> {
    &IO_ERROR
}

/// The designated remote-failure exception every remote method must declare
/// (directly or via a supertype).
pub fn remote_failure() -> &'static Arc<ClassDef> {
    &REMOTE_FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_chain_is_assignable() {
        assert!(throwable_root().is_assignable_from(remote_failure()));
        assert!(io_error().is_assignable_from(remote_failure()));
        assert!(!remote_failure().is_assignable_from(io_error()));
    }

    #[test]
    fn marker_is_remote() {
        assert!(remote_marker().extends_remote());
    }
}
