use std::fmt;

use async_graphql_value::Value;
use indexmap::IndexMap;

use crate::type_map::TypeRef;

/// The intermediate form of a query: a tree of requested fields, keyed by response key, along
/// with the metadata we need to read & write those fields in the cache.
///
/// Prototypes live for a single request and are never persisted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Prototype {
    pub fields: IndexMap<String, ProtoField>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProtoField {
    /// A scalar field
    Leaf(Leaf),
    /// A field with a selection set
    Node(Node),
    /// A named fragment spread that hasn't been resolved yet.
    ///
    /// These only exist between analysis and fragment resolution.
    Spread(String),
}

/// The parts of a field selection that are common to leaves & nodes
#[derive(Clone, Debug, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    pub alias: Option<String>,
    pub arguments: IndexMap<String, Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Leaf {
    pub field: FieldInfo,
    /// Whether the last cache read found this field
    pub found: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub field: FieldInfo,
    /// The entity type of this field, if the type map knows it
    pub ty: Option<TypeRef>,
    /// The identifier of the entity, if the query provides it as an argument
    pub identity: Option<Identity>,
    pub children: IndexMap<String, ProtoField>,
}

/// Identifier values captured from a field's arguments
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Identity {
    Single(String),
    Many(Vec<String>),
}

impl Identity {
    pub fn ids(&self) -> &[String] {
        match self {
            Identity::Single(id) => std::slice::from_ref(id),
            Identity::Many(ids) => ids,
        }
    }

    /// A list typed field always returns a list, even when it's given a single identifier
    pub(crate) fn for_type(self, ty: &TypeRef) -> Identity {
        match self {
            Identity::Single(id) if ty.is_list() => Identity::Many(vec![id]),
            identity => identity,
        }
    }
}

impl FieldInfo {
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// The key this field is stored under inside a record.
    ///
    /// Arguments are part of the key, so `friends(first: 2)` and `friends(first: 5)` never
    /// share a value.
    pub fn storage_key(&self) -> String {
        if self.arguments.is_empty() {
            return self.name.clone();
        }

        format!("{}{}", self.name, ArgumentsDisplay(&self.arguments))
    }

    pub(crate) fn arguments(&self) -> ArgumentsDisplay<'_> {
        ArgumentsDisplay(&self.arguments)
    }
}

/// Renders a set of arguments as `(name: value, ...)`, or nothing if there are none
pub(crate) struct ArgumentsDisplay<'a>(&'a IndexMap<String, Value>);

impl fmt::Display for ArgumentsDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }

        write!(f, "(")?;
        for (index, (name, value)) in self.0.iter().enumerate() {
            let prefix = if index != 0 { ", " } else { "" };
            write!(f, "{prefix}{name}: {value}")?;
        }
        write!(f, ")")
    }
}

impl ProtoField {
    pub fn field(&self) -> Option<&FieldInfo> {
        match self {
            ProtoField::Leaf(leaf) => Some(&leaf.field),
            ProtoField::Node(node) => Some(&node.field),
            ProtoField::Spread(_) => None,
        }
    }

    /// True if this field and everything underneath it was found in the cache
    pub fn is_satisfied(&self) -> bool {
        match self {
            ProtoField::Leaf(leaf) => leaf.found,
            ProtoField::Node(node) => node.is_satisfied(),
            ProtoField::Spread(_) => true,
        }
    }

    pub(crate) fn set_found(&mut self, found: bool) {
        match self {
            ProtoField::Leaf(leaf) => leaf.found = found,
            ProtoField::Node(node) => node.set_found(found),
            ProtoField::Spread(_) => {}
        }
    }
}

impl Node {
    pub fn is_satisfied(&self) -> bool {
        self.children.values().all(ProtoField::is_satisfied)
    }

    /// Flags every leaf underneath this node as missing
    pub(crate) fn mark_missing(&mut self) {
        self.set_found(false);
    }

    pub(crate) fn set_found(&mut self, found: bool) {
        for child in self.children.values_mut() {
            child.set_found(found);
        }
    }

    /// The response key of this node's identifier field, if it was selected
    pub(crate) fn identifier_key(&self, identifier_field: &str) -> Option<&str> {
        self.children.iter().find_map(|(key, child)| match child {
            ProtoField::Leaf(leaf) if leaf.field.name == identifier_field => Some(key.as_str()),
            _ => None,
        })
    }
}

/// Adds a field to a set of fields, merging it with any field already under the same key.
///
/// Object fields are merged recursively.  When both sides have a value for the same key, the
/// incoming side wins if `incoming_wins` is set.  A field keeps the position it was first
/// inserted at.
pub(crate) fn merge_field(
    fields: &mut IndexMap<String, ProtoField>,
    key: String,
    incoming: ProtoField,
    incoming_wins: bool,
) {
    let Some(existing) = fields.get_mut(&key) else {
        fields.insert(key, incoming);
        return;
    };

    match (existing, incoming) {
        (ProtoField::Node(existing), ProtoField::Node(incoming)) => {
            for (child_key, child) in incoming.children {
                merge_field(&mut existing.children, child_key, child, incoming_wins);
            }
            if incoming_wins {
                existing.field = incoming.field;
                existing.ty = incoming.ty;
                existing.identity = incoming.identity;
            }
        }
        (existing, incoming) => {
            if incoming_wins {
                *existing = incoming;
            }
        }
    }
}

impl Prototype {
    pub fn is_satisfied(&self) -> bool {
        self.fields.values().all(ProtoField::is_satisfied)
    }

    pub(crate) fn set_found(&mut self, found: bool) {
        for field in self.fields.values_mut() {
            field.set_found(found);
        }
    }
}

#[cfg(test)]
mod tests {
    use async_graphql_value::Number;

    use super::*;

    fn field(name: &str, alias: Option<&str>, arguments: &[(&str, Value)]) -> FieldInfo {
        FieldInfo {
            name: name.into(),
            alias: alias.map(Into::into),
            arguments: arguments
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        }
    }

    #[test]
    fn test_storage_keys() {
        assert_eq!(field("name", Some("fullName"), &[]).storage_key(), "name");

        let friends = field(
            "friends",
            None,
            &[
                ("first", Value::Number(Number::from(2))),
                ("order", Value::String("asc".into())),
            ],
        );
        assert_eq!(friends.storage_key(), r#"friends(first: 2, order: "asc")"#);
        assert_eq!(friends.response_key(), "friends");
    }

    #[test]
    fn test_satisfaction() {
        let mut node = Node {
            field: field("getCharacter", None, &[]),
            ty: None,
            identity: None,
            children: IndexMap::from([
                (
                    "_id".to_string(),
                    ProtoField::Leaf(Leaf {
                        field: field("_id", None, &[]),
                        found: true,
                    }),
                ),
                (
                    "name".to_string(),
                    ProtoField::Leaf(Leaf {
                        field: field("name", None, &[]),
                        found: true,
                    }),
                ),
            ]),
        };

        assert!(node.is_satisfied());
        assert_eq!(node.identifier_key("_id"), Some("_id"));

        node.mark_missing();
        assert!(!node.is_satisfied());
    }
}
