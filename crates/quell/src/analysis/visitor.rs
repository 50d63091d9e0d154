use async_graphql_parser::{
    types::{Directive, Field, FragmentDefinition, FragmentSpread, OperationDefinition, Selection, SelectionSet},
    Positioned,
};
use async_graphql_value::Value;

use crate::type_map::TypeMap;

#[allow(unused_variables)]
pub(crate) trait Visitor {
    fn enter_field(&mut self, edge: FieldEdge<'_>) {}
    fn exit_field(&mut self, edge: FieldEdge<'_>) {}

    fn fragment_spread(&mut self, spread: &FragmentSpread) {}

    /// Called for anything in the query that we don't know how to cache
    fn unsupported(&mut self, construct: Unsupported<'_>) {}
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct FieldEdge<'a> {
    pub field: &'a Field,
    pub container: Container,
    pub field_type: Option<&'a crate::TypeRef>,
}

impl FieldEdge<'_> {
    pub fn is_leaf(&self) -> bool {
        self.field.selection_set.node.items.is_empty()
    }
}

/// Where a selection set lives
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Container {
    /// Directly on the root query type
    Root,
    /// Inside some other field
    Nested,
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum Unsupported<'a> {
    Directive(&'a str),
    TypeCondition(&'a str),
}

pub(crate) struct VisitorContext<'a, 'b> {
    visitors: &'a mut [&'b mut dyn Visitor],
    type_map: &'a TypeMap,
}

impl<'a, 'b> VisitorContext<'a, 'b> {
    pub fn new(visitors: &'a mut [&'b mut dyn Visitor], type_map: &'a TypeMap) -> Self {
        VisitorContext { visitors, type_map }
    }

    fn visit(&mut self, f: impl Fn(&mut dyn Visitor)) {
        for visitor in self.visitors.iter_mut() {
            f(&mut **visitor);
        }
    }

    /// Evaluates any `@include` & `@skip` directives, reporting any directives we don't understand
    fn included(&mut self, directives: &[Positioned<Directive>]) -> bool {
        let mut included = true;

        for directive in directives {
            let name = directive.node.name.node.as_str();
            let condition = directive
                .node
                .arguments
                .iter()
                .find(|(argument, _)| argument.node.as_str() == "if")
                .map(|(_, value)| &value.node);

            match (name, condition) {
                ("include", Some(Value::Boolean(condition))) => included &= *condition,
                ("skip", Some(Value::Boolean(condition))) => included &= !*condition,
                _ => self.visit(|visitor| visitor.unsupported(Unsupported::Directive(name))),
            }
        }

        included
    }
}

pub(crate) fn visit_operation(operation: &OperationDefinition, ctx: &mut VisitorContext<'_, '_>) {
    visit_selection_set(&operation.selection_set.node, Container::Root, ctx);
}

pub(crate) fn visit_fragment(fragment: &FragmentDefinition, container: Container, ctx: &mut VisitorContext<'_, '_>) {
    visit_selection_set(&fragment.selection_set.node, container, ctx);
}

fn visit_selection_set(selections: &SelectionSet, container: Container, ctx: &mut VisitorContext<'_, '_>) {
    for selection in &selections.items {
        match &selection.node {
            Selection::Field(field) => {
                let field = &field.node;
                if !ctx.included(&field.directives) {
                    continue;
                }

                let name = field.name.node.as_str();
                let type_map = ctx.type_map;
                let field_type = match container {
                    Container::Root => type_map.root_type(name),
                    Container::Nested => type_map.field_type(name),
                };
                let edge = FieldEdge {
                    field,
                    container,
                    field_type,
                };

                ctx.visit(|visitor| visitor.enter_field(edge));

                visit_selection_set(&field.selection_set.node, Container::Nested, ctx);

                ctx.visit(|visitor| visitor.exit_field(edge));
            }
            Selection::InlineFragment(fragment) => {
                let fragment = &fragment.node;
                if !ctx.included(&fragment.directives) {
                    continue;
                }

                if let Some(condition) = &fragment.type_condition {
                    let type_name = condition.node.on.node.as_str();
                    if ctx.type_map.canonical_type(type_name).is_none() {
                        ctx.visit(|visitor| visitor.unsupported(Unsupported::TypeCondition(type_name)));
                    }
                }

                visit_selection_set(&fragment.selection_set.node, container, ctx);
            }
            Selection::FragmentSpread(spread) => {
                let spread = &spread.node;
                if !ctx.included(&spread.directives) {
                    continue;
                }

                ctx.visit(|visitor| visitor.fragment_spread(spread));
            }
        }
    }
}
