use std::collections::HashSet;

use futures_util::future::try_join_all;
use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};

use super::ROOT_QUERY_KEY;
use crate::{
    prototype::{Identity, Node, ProtoField, Prototype},
    store::{FieldValue, Record, Records, Store, StoreResult},
};

/// The result of reading a prototype out of the cache
#[derive(Clone, Debug, PartialEq)]
pub struct CacheRead {
    /// Everything we found, shaped like a response to the query
    pub data: Value,
    /// How many leaf values were read from the cache
    pub hits: usize,
}

impl CacheRead {
    /// True if nothing at all was found
    pub fn is_miss(&self) -> bool {
        self.hits == 0
    }
}

/// Fetches every record that a prototype could touch from the store.
///
/// This walks the prototype a level at a time, only following references from fields that are
/// actually selected.  Records that don't exist are skipped, it's up to
/// [`build_from_cache`] to work out what that means.
pub async fn load_records(store: &Store, prototype: &Prototype) -> StoreResult<Records> {
    let mut records = Records::new();
    let mut frontier = Vec::new();
    let mut root_lists = Vec::new();

    for node in root_nodes(prototype) {
        match (&node.identity, &node.ty) {
            (Some(identity), Some(ty)) => {
                frontier.extend(identity.ids().iter().map(|id| (ty.cache_key(id), node)));
            }
            (None, Some(ty)) if ty.is_list() => root_lists.push(node),
            _ => {}
        }
    }

    if !root_lists.is_empty() {
        if let Some(root) = store.get(ROOT_QUERY_KEY).await? {
            for node in root_lists {
                if let Some(value) = root.get(&node.field.storage_key()) {
                    frontier.extend(
                        value
                            .references()
                            .into_iter()
                            .map(|reference| (reference.key.clone(), node)),
                    );
                }
            }
            records.insert(ROOT_QUERY_KEY.to_string(), root);
        }
    }

    let mut absent = HashSet::new();

    while !frontier.is_empty() {
        let wanted = frontier
            .iter()
            .map(|(key, _)| key.as_str())
            .filter(|key| !records.contains_key(*key) && !absent.contains(*key))
            .collect::<IndexSet<_>>();

        let fetched = try_join_all(wanted.iter().map(|key| store.get(key))).await?;

        for (key, record) in wanted.into_iter().zip(fetched) {
            match record {
                Some(record) => {
                    records.insert(key.to_string(), record);
                }
                None => {
                    tracing::trace!("{key} is not in the store");
                    absent.insert(key.to_string());
                }
            }
        }

        let mut next = Vec::new();
        for (key, node) in &frontier {
            if let Some(record) = records.get(key) {
                collect_references(record, &node.children, &mut next);
            }
        }
        frontier = next;
    }

    Ok(records)
}

fn root_nodes(prototype: &Prototype) -> impl Iterator<Item = &Node> {
    prototype.fields.values().filter_map(|field| match field {
        ProtoField::Node(node) => Some(node),
        _ => None,
    })
}

fn collect_references<'p>(
    record: &Record,
    children: &'p IndexMap<String, ProtoField>,
    out: &mut Vec<(String, &'p Node)>,
) {
    for child in children.values() {
        let ProtoField::Node(node) = child else {
            continue;
        };

        if let Some(value) = record.get(&node.field.storage_key()) {
            collect_value_references(value, node, out);
        }
    }
}

fn collect_value_references<'p>(value: &FieldValue, node: &'p Node, out: &mut Vec<(String, &'p Node)>) {
    match value {
        FieldValue::Reference(reference) => out.push((reference.key.clone(), node)),
        FieldValue::List(items) => {
            for item in items {
                collect_value_references(item, node, out);
            }
        }
        FieldValue::Embedded(embedded) => collect_references(&embedded.record, &node.children, out),
        FieldValue::Scalar(_) => {}
    }
}

/// Builds as much of a response as it can from a set of records.
///
/// Every field in the prototype is flagged as found or missing along the way, so the
/// prototype can be used to build a query for whatever is missing.  Nothing here touches the
/// store: the records should come from [`load_records`].
pub fn build_from_cache(prototype: &mut Prototype, records: &Records) -> CacheRead {
    prototype.set_found(true);

    let mut reader = Reader { records, hits: 0 };
    let mut data = Map::new();

    for (key, field) in prototype.fields.iter_mut() {
        match field {
            ProtoField::Node(node) => {
                let value = reader.read_root(node);
                data.insert(key.clone(), value);
            }
            ProtoField::Leaf(leaf) => leaf.found = false,
            ProtoField::Spread(_) => {}
        }
    }

    CacheRead {
        data: Value::Object(data),
        hits: reader.hits,
    }
}

struct Reader<'a> {
    records: &'a Records,
    hits: usize,
}

impl Reader<'_> {
    fn read_root(&mut self, node: &mut Node) -> Value {
        let records = self.records;
        let Some(ty) = node.ty.clone() else {
            node.mark_missing();
            return Value::Null;
        };

        match node.identity.clone().map(|identity| identity.for_type(&ty)) {
            Some(Identity::Single(id)) => match records.get(&ty.cache_key(&id)) {
                Some(record) => self.read_object(record, &mut node.children),
                None => {
                    node.mark_missing();
                    Value::Object(Map::new())
                }
            },
            Some(Identity::Many(ids)) => {
                let mut items = Vec::with_capacity(ids.len());
                for id in &ids {
                    let Some(record) = records.get(&ty.cache_key(id)) else {
                        node.mark_missing();
                        return Value::Array(Vec::new());
                    };
                    items.push(self.read_object(record, &mut node.children));
                }
                Value::Array(items)
            }
            None => {
                let value = records
                    .get(ROOT_QUERY_KEY)
                    .and_then(|root| root.get(&node.field.storage_key()));

                match value {
                    Some(value @ FieldValue::List(_)) => self.read_value(value, node),
                    _ => {
                        node.mark_missing();
                        Value::Array(Vec::new())
                    }
                }
            }
        }
    }

    fn read_object(&mut self, record: &Record, children: &mut IndexMap<String, ProtoField>) -> Value {
        let mut object = Map::new();

        for (key, child) in children.iter_mut() {
            match child {
                ProtoField::Leaf(leaf) => {
                    match record
                        .get(&leaf.field.storage_key())
                        .and_then(FieldValue::to_scalar_json)
                    {
                        Some(value) => {
                            self.hits += 1;
                            object.insert(key.clone(), value);
                        }
                        None => leaf.found = false,
                    }
                }
                ProtoField::Node(node) => match record.get(&node.field.storage_key()) {
                    Some(value) => {
                        let value = self.read_value(value, node);
                        object.insert(key.clone(), value);
                    }
                    None => node.mark_missing(),
                },
                ProtoField::Spread(_) => {}
            }
        }

        Value::Object(object)
    }

    fn read_value(&mut self, value: &FieldValue, node: &mut Node) -> Value {
        let records = self.records;

        match value {
            FieldValue::Reference(reference) => match records.get(&reference.key) {
                Some(record) => self.read_object(record, &mut node.children),
                None => {
                    node.mark_missing();
                    Value::Null
                }
            },
            FieldValue::Embedded(embedded) => self.read_object(&embedded.record, &mut node.children),
            FieldValue::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.read_value(item, node));
                }
                Value::Array(values)
            }
            FieldValue::Scalar(Value::Null) => Value::Null,
            // An object we couldn't normalize, we don't know which of its fields are usable
            FieldValue::Scalar(_) => {
                node.mark_missing();
                Value::Null
            }
        }
    }
}
