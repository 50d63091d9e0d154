//! This crate implements client-side normalized caching for GraphQL queries.
//!
//! Most of the crate is side effect free - the analysis, cache reads, query rebuilding and
//! response joining are pure functions of their inputs.  The only side effects live in the
//! [`QuellClient`], which talks to a [`Transport`] and a [`Store`] provided by the integrator.
//!
//! The process is a little bit involved, so it's broken up into phases:
//!
//! 1. First we analyze the incoming query into a [`Prototype`] and classify it.
//! 2. Then we resolve any fragment spreads into the prototype.
//! 3. Then we read what we can from the store, flagging every field as found or missing.
//! 4. Then we rebuild a query for the missing fields and fetch it, if required.
//! 5. Then we join the cached & fetched trees and normalize the result back into the store.

mod analysis;
mod cache;
mod client;
mod error;
mod fetch;
mod fragments;
mod join;
mod options;
mod prototype;
mod rebuild;
mod response;
pub mod store;
mod type_map;

pub use self::{
    analysis::{analyze, Analysis, OperationKind},
    cache::{build_from_cache, load_records, normalize, CacheRead, ROOT_QUERY_KEY},
    client::QuellClient,
    error::QuellError,
    fetch::{GraphqlRequest, Transport, TransportError, TransportInner, TransportResult},
    fragments::{resolve_fragments, Fragment, Fragments},
    join::join_responses,
    options::{Options, StorageBackend, DEFAULT_IDENTIFIER_FIELD},
    prototype::{FieldInfo, Identity, Leaf, Node, ProtoField, Prototype},
    rebuild::DiffQuery,
    response::{CacheStatus, Response},
    store::{FieldValue, Record, Records, Reference, Store, StoreError, StoreInner, StoreResult},
    type_map::{TypeMap, TypeRef},
};
