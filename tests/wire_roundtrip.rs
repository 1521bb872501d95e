// Round-trip laws for the wire form: descriptors survive encoding, decoded
// parameters re-intern to canonical handles, and identifiers are preserved
// within a session namespace.

use std::sync::Arc;

use remi::model::{ClassDef, InterfaceDef, Primitive, TypeRef, method, well_known};
use remi::{IntrospectError, IntrospectionContext, decode_interface, encode_interface};

fn remote_iface(name: &str) -> Arc<InterfaceDef> {
    InterfaceDef::builder(name)
        .extend(well_known::remote_marker())
        .build()
}

fn failure() -> &'static Arc<ClassDef> {
    well_known::remote_failure()
}

#[test]
fn decode_into_the_same_context_reuses_the_descriptor() {
    let mut ctx = IntrospectionContext::new();
    let iface = remote_iface("demo.Echo");
    iface.define(vec![
        method("echo")
            .param(TypeRef::Str)
            .returns(TypeRef::Str)
            .throws(failure())
            .build(),
    ]);

    let handle = ctx.examine(&iface).unwrap();
    let bytes = encode_interface(&ctx, handle).unwrap();
    let adopted = decode_interface(&mut ctx, &bytes).unwrap();
    assert_eq!(adopted, handle);
}

#[test]
fn decode_into_a_fresh_context_preserves_structure() {
    let mut origin = IntrospectionContext::new();
    let blob = ClassDef::serializable("demo.Payload");
    let iface = remote_iface("demo.Transfer");
    iface.define(vec![
        method("upload")
            .param(TypeRef::Class(blob))
            .param(TypeRef::array(TypeRef::Primitive(Primitive::I8)))
            .returns(TypeRef::Primitive(Primitive::Bool))
            .throws(failure())
            .idempotent()
            .build(),
    ]);

    let handle = origin.examine(&iface).unwrap();
    let bytes = encode_interface(&origin, handle).unwrap();

    let mut target = IntrospectionContext::new();
    let adopted = decode_interface(&mut target, &bytes).unwrap();

    let from = origin.interface(handle);
    let to = target.interface(adopted);
    assert_eq!(to.id(), from.id());
    assert_eq!(to.name(), from.name());
    assert_eq!(to.methods().len(), from.methods().len());

    let m_from = &from.methods()[0];
    let m_to = &to.methods()[0];
    assert_eq!(m_to.id(), m_from.id());
    assert_eq!(m_to.is_idempotent(), m_from.is_idempotent());
    assert_eq!(
        m_to.signature(target.arena(), Some("demo.Transfer")),
        m_from.signature(origin.arena(), Some("demo.Transfer"))
    );
    for (&a, &b) in m_from.params().iter().zip(m_to.params()) {
        assert_eq!(origin.param(a), target.param(b));
    }
}

#[test]
fn decoded_parameters_reintern_to_canonical_handles() {
    let mut origin = IntrospectionContext::new();
    let iface = remote_iface("demo.Twice");
    iface.define(vec![
        method("go")
            .param(TypeRef::Primitive(Primitive::I64))
            .throws(failure())
            .build(),
    ]);
    let handle = origin.examine(&iface).unwrap();
    let bytes = encode_interface(&origin, handle).unwrap();

    let mut target = IntrospectionContext::new();
    let first = decode_interface(&mut target, &bytes).unwrap();
    let second = decode_interface(&mut target, &bytes).unwrap();
    // Same identifier: the catalog resolves to the already-adopted graph.
    assert_eq!(first, second);

    // A locally examined interface with the same parameter shape shares the
    // interned descriptor with the adopted one.
    let local = remote_iface("demo.Local");
    local.define(vec![
        method("go")
            .param(TypeRef::Primitive(Primitive::I64))
            .throws(failure())
            .build(),
    ]);
    let hlocal = target.examine(&local).unwrap();
    let p_adopted = target.interface(first).methods()[0].params()[0];
    let p_local = target.interface(hlocal).methods()[0].params()[0];
    assert_eq!(p_adopted, p_local);
}

#[test]
fn cyclic_graphs_round_trip() {
    let mut origin = IntrospectionContext::new();
    let link = remote_iface("demo.Ring");
    link.define(vec![
        method("next")
            .returns(TypeRef::iface(&link))
            .throws(failure())
            .build(),
    ]);
    let handle = origin.examine(&link).unwrap();
    let bytes = encode_interface(&origin, handle).unwrap();

    let mut target = IntrospectionContext::new();
    let adopted = decode_interface(&mut target, &bytes).unwrap();
    let ret = target.param(
        target
            .interface(adopted)
            .methods()[0]
            .return_type()
            .unwrap(),
    );
    assert_eq!(ret.remote_type().unwrap(), adopted);
}

#[test]
fn exception_supertype_chains_survive_the_trip() {
    let mut origin = IntrospectionContext::new();
    let iface = remote_iface("demo.Chained");
    iface.define(vec![method("op").throws(well_known::io_error()).build()]);
    let handle = origin.examine(&iface).unwrap();
    let bytes = encode_interface(&origin, handle).unwrap();

    let mut target = IntrospectionContext::new();
    let adopted = decode_interface(&mut target, &bytes).unwrap();
    let m = &target.interface(adopted).methods()[0];
    // The decoded declaration still covers the remote failure through its
    // rebuilt supertype chain.
    assert!(m.declares_class(target.arena(), well_known::remote_failure()));
}

#[test]
fn garbage_bytes_are_rejected() {
    let mut ctx = IntrospectionContext::new();
    assert!(matches!(
        decode_interface(&mut ctx, &[0xff, 0x01, 0x02]),
        Err(IntrospectError::CatalogDecode { .. })
    ));
}

#[test]
fn identifier_bytes_round_trip() {
    let id = remi::Identifier::next();
    let copied = remi::Identifier::from_bytes(id.to_bytes());
    assert_eq!(copied, id);
    assert_eq!(copied.raw(), id.raw());
}
