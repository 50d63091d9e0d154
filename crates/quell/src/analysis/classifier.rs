use async_graphql_value::Value;

use super::{
    builder::identity_from_value,
    visitor::{Container, FieldEdge, Unsupported, Visitor},
    OperationKind,
};

/// A visitor that decides whether an operation can be served from the cache.
///
/// The first reason we find for passing an operation through is kept, but we keep walking so
/// the prototype still gets built.
pub(crate) struct Classifier<'a> {
    identifier_field: &'a str,
    pass_through_reason: Option<String>,
}

impl<'a> Classifier<'a> {
    pub fn new(identifier_field: &'a str) -> Self {
        Classifier {
            identifier_field,
            pass_through_reason: None,
        }
    }

    pub fn pass_through(&mut self, reason: impl Into<String>) {
        if self.pass_through_reason.is_none() {
            self.pass_through_reason = Some(reason.into());
        }
    }

    pub fn finish(self) -> (OperationKind, Option<String>) {
        match self.pass_through_reason {
            Some(reason) => (OperationKind::PassThrough, Some(reason)),
            None => (OperationKind::Cacheable, None),
        }
    }
}

impl Visitor for Classifier<'_> {
    fn enter_field(&mut self, edge: FieldEdge<'_>) {
        let name = edge.field.name.node.as_str();

        if edge
            .field
            .arguments
            .iter()
            .any(|(_, value)| contains_variable(&value.node))
        {
            self.pass_through(format!("field `{name}` has a variable argument"));
        }

        if edge.container == Container::Nested {
            if !edge.is_leaf() && edge.field_type.is_none() {
                tracing::warn!("the type of `{name}` is unknown, it will always be fetched");
            }
            return;
        }

        if edge.is_leaf() {
            self.pass_through(format!("root field `{name}` is not an entity"));
            return;
        }

        match edge.field_type {
            None => self.pass_through(format!("root field `{name}` is not in the type map")),
            Some(ty) if ty.is_list() => {}
            Some(_) => {
                let has_identifier = edge
                    .field
                    .arguments
                    .iter()
                    .find(|(argument, _)| argument.node.as_str() == self.identifier_field)
                    .and_then(|(_, value)| identity_from_value(&value.node))
                    .is_some();

                if !has_identifier {
                    self.pass_through(format!("root field `{name}` has no `{}` argument", self.identifier_field));
                }
            }
        }
    }

    fn unsupported(&mut self, construct: Unsupported<'_>) {
        match construct {
            Unsupported::Directive(name) => self.pass_through(format!("unsupported directive `@{name}`")),
            Unsupported::TypeCondition(name) => self.pass_through(format!("unknown type condition `{name}`")),
        }
    }
}

fn contains_variable(value: &Value) -> bool {
    match value {
        Value::Variable(_) => true,
        Value::List(items) => items.iter().any(contains_variable),
        Value::Object(fields) => fields.values().any(contains_variable),
        _ => false,
    }
}
