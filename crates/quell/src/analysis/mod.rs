//! Turns a parsed query into a [`Prototype`] and decides whether it's cacheable.

use async_graphql_parser::types::{ExecutableDocument, OperationType};
use indexmap::IndexMap;

use self::{
    builder::PrototypeBuilder,
    classifier::Classifier,
    visitor::{visit_fragment, visit_operation, Container, Visitor, VisitorContext},
};
use crate::{
    fragments::{Fragment, Fragments},
    prototype::{ProtoField, Prototype},
    type_map::{TypeMap, ROOT_TYPE},
    QuellError,
};

mod builder;
mod classifier;
mod visitor;

/// Whether an operation can be served from the cache
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Cacheable,
    /// The operation must be sent to the server verbatim, and never touches the cache
    PassThrough,
}

#[derive(Debug)]
pub struct Analysis {
    pub prototype: Prototype,
    pub kind: OperationKind,
    /// Why the operation was classified as pass-through, if it was
    pub pass_through_reason: Option<String>,
    /// Every fragment defined in the document
    pub fragments: Fragments,
}

/// Analyzes a query document.
///
/// The prototype is built even for pass-through operations, though callers will generally
/// discard it.  Fragment spreads are left in the prototype for
/// [`resolve_fragments`](crate::resolve_fragments) to deal with.
pub fn analyze(
    document: &ExecutableDocument,
    type_map: &TypeMap,
    identifier_field: &str,
) -> Result<Analysis, QuellError> {
    let mut operations = document.operations.iter();
    let (Some((_, operation)), None) = (operations.next(), operations.next()) else {
        return Err(QuellError::malformed("expected a document with exactly one operation"));
    };
    let operation = &operation.node;

    let mut classifier = Classifier::new(identifier_field);

    match operation.ty {
        OperationType::Query => {}
        OperationType::Mutation => classifier.pass_through("operation is a mutation"),
        OperationType::Subscription => classifier.pass_through("operation is a subscription"),
    }

    if !operation.variable_definitions.is_empty() {
        classifier.pass_through("operation declares variables");
    }

    if !operation.directives.is_empty() {
        classifier.pass_through("operation has directives");
    }

    let fields = collect_fields(&mut classifier, type_map, identifier_field, |ctx| {
        visit_operation(operation, ctx)
    });

    let mut fragments = Fragments::default();
    for (name, definition) in &document.fragments {
        let definition = &definition.node;
        let type_name = definition.type_condition.node.on.node.as_str();

        let container = match type_map.canonical_type(type_name) {
            Some(ROOT_TYPE) => Container::Root,
            Some(_) => Container::Nested,
            None => {
                classifier.pass_through(format!("fragment `{name}` is on unknown type `{type_name}`"));
                Container::Nested
            }
        };

        if !definition.directives.is_empty() {
            classifier.pass_through(format!("fragment `{name}` has directives"));
        }

        let fields = collect_fields(&mut classifier, type_map, identifier_field, |ctx| {
            visit_fragment(definition, container, ctx)
        });

        fragments.insert(
            name.to_string(),
            Fragment {
                type_condition: type_name.to_lowercase(),
                fields,
            },
        );
    }

    let (kind, pass_through_reason) = classifier.finish();
    if let Some(reason) = &pass_through_reason {
        tracing::debug!("operation will be passed through: {reason}");
    }

    Ok(Analysis {
        prototype: Prototype { fields },
        kind,
        pass_through_reason,
        fragments,
    })
}

fn collect_fields(
    classifier: &mut Classifier<'_>,
    type_map: &TypeMap,
    identifier_field: &str,
    walk: impl FnOnce(&mut VisitorContext<'_, '_>),
) -> IndexMap<String, ProtoField> {
    let mut builder = PrototypeBuilder::new(identifier_field);

    {
        let mut visitors: [&mut dyn Visitor; 2] = [&mut builder, &mut *classifier];
        let mut ctx = VisitorContext::new(&mut visitors, type_map);
        walk(&mut ctx);
    }

    builder.finish()
}
