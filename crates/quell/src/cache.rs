//! Reading prototypes out of the store, and writing responses back into it.

mod read;
mod write;

pub use self::{
    read::{build_from_cache, load_records, CacheRead},
    write::normalize,
};

/// The record that holds root list fields that weren't queried by identifier.
///
/// Each such field is stored on this record under its storage key, as a list of references.
pub const ROOT_QUERY_KEY: &str = "query:root";

/// Converts an identifier value from a response into the string used in store keys
fn identifier(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(id) => Some(id.clone()),
        serde_json::Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
