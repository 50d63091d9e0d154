//! Implementations of the quell transport & store for use in native processes.

mod fetch;
mod store;

pub use self::{
    fetch::NativeTransport,
    store::{open_store, FileStore},
};
