//! Introspection errors (R1xxx).

use miette::Diagnostic;
use thiserror::Error;

/// Rejection of a candidate interface, or a wire-form failure.
///
/// `examine` surfaces the first violation detected, carrying the method
/// signature or conflicting annotation name needed to diagnose it.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum IntrospectError {
    #[error("remote interface reference is missing")]
    #[diagnostic(code(R1001))]
    MissingInterface,

    #[error("remote type must be an interface: {name}")]
    #[diagnostic(code(R1002))]
    NotAnInterface { name: String },

    #[error("remote interface must be public: {name}")]
    #[diagnostic(code(R1003))]
    NotPublic { name: String },

    #[error("remote interface must extend the remote marker: {name}")]
    #[diagnostic(
        code(R1004),
        help("add the root remote marker to the interface's extends clause")
    )]
    NotRemote { name: String },

    #[error("method must declare throwing the remote failure (or a supertype): {signature}")]
    #[diagnostic(code(R1005))]
    MissingFailureThrow { signature: String },

    #[error("asynchronous method must return void: {signature}")]
    #[diagnostic(code(R1006))]
    AsyncReturnsValue { signature: String },

    #[error("asynchronous method can only throw the remote failure: {signature}")]
    #[diagnostic(
        code(R1007),
        help("declare the remote failure or one of its supertypes, nothing else")
    )]
    AsyncForeignThrow { signature: String },

    #[error("inherited methods conflict in use of the {annotation} annotation: {left} and {right}")]
    #[diagnostic(code(R1008))]
    AnnotationConflict {
        annotation: &'static str,
        left: String,
        right: String,
    },

    #[error("wire encoding failed: {detail}")]
    #[diagnostic(code(R1020))]
    CatalogEncode { detail: String },

    #[error("wire catalog is malformed: {detail}")]
    #[diagnostic(code(R1021))]
    CatalogDecode { detail: String },
}

/// A method lookup that did not resolve. A normal outcome of lookup,
/// surfaced to the caller without logging.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
#[error("no such method: {key}")]
#[diagnostic(code(R1010))]
pub struct NoSuchMethod {
    pub key: String,
}
