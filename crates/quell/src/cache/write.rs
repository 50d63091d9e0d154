use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::{identifier, ROOT_QUERY_KEY};
use crate::{
    prototype::{Identity, Node, ProtoField, Prototype},
    store::{Embedded, FieldValue, Record, Records},
    type_map::TypeRef,
};

/// Flattens the data of a response into records, ready to be merged into the store.
///
/// Entities are keyed on the identifier in the response, falling back to the identifier
/// argument for root fields.  Typed objects with no identifier are embedded in their parent,
/// and objects of unknown type are kept as opaque values.  Records for nested entities are
/// always ordered before the records that reference them.
///
/// When a root field asks for several identifiers and the response doesn't include the
/// identifier field, items are matched to identifiers by position.  This relies on the server
/// returning them in the order they were asked for.  Select the identifier field when that
/// isn't guaranteed: an identifier in the response always wins.
pub fn normalize(data: &Value, prototype: &Prototype, identifier_field: &str) -> Records {
    let mut writer = Writer {
        identifier_field,
        records: Records::new(),
    };
    let mut root = Record::default();

    for (key, field) in &prototype.fields {
        let ProtoField::Node(node) = field else {
            continue;
        };
        let (Some(ty), Some(value)) = (&node.ty, data.get(key)) else {
            continue;
        };

        match (node.identity.clone().map(|identity| identity.for_type(ty)), value) {
            (Some(Identity::Single(id)), Value::Object(object)) => {
                writer.write_entity(ty, object, node, Some(&id));
            }
            (Some(Identity::Many(ids)), Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    if let Value::Object(object) = item {
                        writer.write_entity(ty, object, node, ids.get(index).map(String::as_str));
                    }
                }
            }
            (None, Value::Array(_)) => {
                let value = writer.write_value(value, node);
                root.insert(node.field.storage_key(), value);
            }
            _ => {}
        }
    }

    if !root.is_empty() {
        writer
            .records
            .entry(ROOT_QUERY_KEY.to_string())
            .or_default()
            .merge(root);
    }

    writer.records
}

struct Writer<'a> {
    identifier_field: &'a str,
    records: Records,
}

impl Writer<'_> {
    /// Writes an object as an entity record, returning its key.
    ///
    /// Returns None without writing anything if the object can't be identified.
    fn write_entity(
        &mut self,
        ty: &TypeRef,
        object: &Map<String, Value>,
        node: &Node,
        fallback_id: Option<&str>,
    ) -> Option<String> {
        let id = node
            .identifier_key(self.identifier_field)
            .and_then(|key| object.get(key))
            .and_then(identifier)
            .or_else(|| fallback_id.map(str::to_string))?;

        let key = ty.cache_key(&id);
        let record = self.write_object(object, &node.children);
        self.records.entry(key.clone()).or_default().merge(record);

        Some(key)
    }

    fn write_object(&mut self, object: &Map<String, Value>, children: &IndexMap<String, ProtoField>) -> Record {
        let mut record = Record::default();

        for (key, child) in children {
            let Some(value) = object.get(key) else {
                continue;
            };

            match child {
                ProtoField::Leaf(leaf) => record.insert(leaf.field.storage_key(), FieldValue::Scalar(value.clone())),
                ProtoField::Node(node) => {
                    let value = self.write_value(value, node);
                    record.insert(node.field.storage_key(), value);
                }
                ProtoField::Spread(_) => {}
            }
        }

        record
    }

    fn write_value(&mut self, value: &Value, node: &Node) -> FieldValue {
        match (value, &node.ty) {
            (Value::Array(items), _) => FieldValue::List(items.iter().map(|item| self.write_value(item, node)).collect()),
            (Value::Object(object), Some(ty)) => match self.write_entity(ty, object, node, None) {
                Some(key) => FieldValue::reference(key),
                None => FieldValue::Embedded(Embedded {
                    record: self.write_object(object, &node.children),
                }),
            },
            (value, _) => FieldValue::Scalar(value.clone()),
        }
    }
}
