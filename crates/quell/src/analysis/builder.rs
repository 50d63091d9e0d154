use async_graphql_parser::types::{Field, FragmentSpread};
use async_graphql_value::Value;
use indexmap::IndexMap;

use super::visitor::{FieldEdge, Visitor};
use crate::prototype::{merge_field, FieldInfo, Identity, Leaf, Node, ProtoField};

/// A visitor that builds up the prototype fields of a selection set
pub(crate) struct PrototypeBuilder<'a> {
    identifier_field: &'a str,
    /// The children of every node we're currently inside, with the top level at the bottom
    stack: Vec<IndexMap<String, ProtoField>>,
}

impl<'a> PrototypeBuilder<'a> {
    pub fn new(identifier_field: &'a str) -> Self {
        PrototypeBuilder {
            identifier_field,
            stack: vec![IndexMap::new()],
        }
    }

    pub fn finish(mut self) -> IndexMap<String, ProtoField> {
        // Enter & exit are always balanced, so there should only be one frame left
        self.stack.pop().unwrap_or_default()
    }

    fn insert(&mut self, key: String, field: ProtoField) {
        if let Some(frame) = self.stack.last_mut() {
            merge_field(frame, key, field, true);
        }
    }
}

impl Visitor for PrototypeBuilder<'_> {
    fn enter_field(&mut self, edge: FieldEdge<'_>) {
        if edge.is_leaf() {
            let field = field_info(edge.field);
            let key = field.response_key().to_string();
            self.insert(key, ProtoField::Leaf(Leaf { field, found: false }));
            return;
        }

        self.stack.push(IndexMap::new());
    }

    fn exit_field(&mut self, edge: FieldEdge<'_>) {
        if edge.is_leaf() {
            return;
        }

        let children = self.stack.pop().unwrap_or_default();
        let field = field_info(edge.field);
        let key = field.response_key().to_string();
        let identity = identity(&field, self.identifier_field).map(|identity| match edge.field_type {
            Some(ty) => identity.for_type(ty),
            None => identity,
        });

        let node = Node {
            field,
            ty: edge.field_type.cloned(),
            identity,
            children,
        };

        self.insert(key, ProtoField::Node(node));
    }

    fn fragment_spread(&mut self, spread: &FragmentSpread) {
        let name = spread.fragment_name.node.to_string();
        self.insert(format!("...{name}"), ProtoField::Spread(name));
    }
}

fn field_info(field: &Field) -> FieldInfo {
    FieldInfo {
        name: field.name.node.to_string(),
        alias: field.alias.as_ref().map(|alias| alias.node.to_string()),
        arguments: field
            .arguments
            .iter()
            .map(|(name, value)| (name.node.to_string(), value.node.clone()))
            .collect(),
    }
}

/// Pulls the identifier of an entity out of a fields arguments, if it's there
pub(crate) fn identity(field: &FieldInfo, identifier_field: &str) -> Option<Identity> {
    field.arguments.get(identifier_field).and_then(identity_from_value)
}

/// Converts an identifier argument into an identity.  Lists of identifiers identify many
/// entities.
pub(crate) fn identity_from_value(value: &Value) -> Option<Identity> {
    match value {
        Value::List(items) => items
            .iter()
            .map(scalar_identifier)
            .collect::<Option<Vec<_>>>()
            .map(Identity::Many),
        value => scalar_identifier(value).map(Identity::Single),
    }
}

fn scalar_identifier(value: &Value) -> Option<String> {
    match value {
        Value::Number(number) => Some(number.to_string()),
        Value::String(string) => Some(string.clone()),
        Value::Enum(name) => Some(name.to_string()),
        _ => None,
    }
}
