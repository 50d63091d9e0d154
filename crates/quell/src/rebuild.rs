use std::fmt;

use indexmap::IndexMap;

use crate::prototype::{Node, ProtoField, Prototype};

/// A query for the parts of a prototype that weren't found in the cache.
///
/// This keeps every missing leaf along with all of its ancestors, including their aliases
/// & arguments, so the response to it has the same shape as the original query.
#[derive(Clone, Debug, PartialEq)]
pub struct DiffQuery {
    fields: IndexMap<String, ProtoField>,
}

impl DiffQuery {
    pub fn from_prototype(prototype: &Prototype) -> Self {
        DiffQuery {
            fields: missing_fields(&prototype.fields),
        }
    }

    /// True if everything was found, in which case there's nothing to fetch
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &IndexMap<String, ProtoField> {
        &self.fields
    }
}

fn missing_fields(fields: &IndexMap<String, ProtoField>) -> IndexMap<String, ProtoField> {
    fields
        .iter()
        .filter_map(|(key, field)| {
            let field = match field {
                ProtoField::Leaf(leaf) if !leaf.found => field.clone(),
                ProtoField::Node(node) => {
                    let children = missing_fields(&node.children);
                    if children.is_empty() {
                        return None;
                    }
                    ProtoField::Node(Node {
                        field: node.field.clone(),
                        ty: node.ty.clone(),
                        identity: node.identity.clone(),
                        children,
                    })
                }
                _ => return None,
            };
            Some((key.clone(), field))
        })
        .collect()
}

impl fmt::Display for DiffQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "query {}",
            SelectionSet {
                fields: &self.fields,
                indent_level: 0
            }
        )
    }
}

macro_rules! write_indent {
    ($f:expr, $level:expr) => {
        write!($f, "{:indent$}", "", indent = $level * 2)
    };
}

struct SelectionSet<'a> {
    fields: &'a IndexMap<String, ProtoField>,
    indent_level: usize,
}

impl fmt::Display for SelectionSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.is_empty() {
            return Ok(());
        }
        writeln!(f, "{{")?;
        for field in self.fields.values() {
            writeln!(
                f,
                "{}",
                Selection {
                    field,
                    indent_level: self.indent_level + 1
                }
            )?;
        }
        write_indent!(f, self.indent_level)?;
        write!(f, "}}")
    }
}

struct Selection<'a> {
    field: &'a ProtoField,
    indent_level: usize,
}

impl fmt::Display for Selection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_indent!(f, self.indent_level)?;

        let Some(field) = self.field.field() else {
            return Ok(());
        };

        if let Some(alias) = &field.alias {
            write!(f, "{alias}: ")?;
        }
        write!(f, "{}{}", field.name, field.arguments())?;

        if let ProtoField::Node(node) = self.field {
            write!(
                f,
                " {}",
                SelectionSet {
                    fields: &node.children,
                    indent_level: self.indent_level
                }
            )?;
        }

        Ok(())
    }
}
