use std::collections::HashMap;

use indexmap::IndexMap;

use crate::{
    prototype::{merge_field, ProtoField, Prototype},
    QuellError,
};

/// A named fragment definition, analyzed into prototype fields.
#[derive(Clone, Debug, PartialEq)]
pub struct Fragment {
    /// The lower-cased type the fragment applies to
    pub type_condition: String,
    pub fields: IndexMap<String, ProtoField>,
}

/// All the fragments defined in a document, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct Fragments {
    fragments: HashMap<String, Fragment>,
}

impl Fragments {
    pub fn insert(&mut self, name: String, fragment: Fragment) {
        self.fragments.insert(name, fragment);
    }

    pub fn get(&self, name: &str) -> Option<&Fragment> {
        self.fragments.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Replaces every fragment spread in a prototype with the fields of that fragment.
///
/// A fragments fields are spliced in where the spread was.  Fields that were selected
/// explicitly take precedence over fields from fragments, and when two fragments select the
/// same field the first one wins.  Object fields are merged rather than replaced.
pub fn resolve_fragments(prototype: Prototype, fragments: &Fragments) -> Result<Prototype, QuellError> {
    let mut resolver = Resolver {
        fragments,
        active: Vec::new(),
    };

    Ok(Prototype {
        fields: resolver.resolve(prototype.fields)?,
    })
}

struct Resolver<'a> {
    fragments: &'a Fragments,
    /// The fragments we're currently in the middle of resolving
    active: Vec<&'a str>,
}

impl<'a> Resolver<'a> {
    fn resolve(&mut self, fields: IndexMap<String, ProtoField>) -> Result<IndexMap<String, ProtoField>, QuellError> {
        let mut resolved = IndexMap::with_capacity(fields.len());

        for (key, field) in fields {
            match field {
                ProtoField::Spread(name) => {
                    for (key, field) in self.expand(&name)? {
                        merge_field(&mut resolved, key, field, false);
                    }
                }
                ProtoField::Node(mut node) => {
                    node.children = self.resolve(node.children)?;
                    merge_field(&mut resolved, key, ProtoField::Node(node), true);
                }
                leaf @ ProtoField::Leaf(_) => merge_field(&mut resolved, key, leaf, true),
            }
        }

        Ok(resolved)
    }

    fn expand(&mut self, name: &str) -> Result<IndexMap<String, ProtoField>, QuellError> {
        let Some((name, fragment)) = self.fragments.fragments.get_key_value(name) else {
            return Err(QuellError::UnknownFragment(name.to_string()));
        };

        if self.active.contains(&name.as_str()) {
            return Err(QuellError::FragmentCycle(name.clone()));
        }

        self.active.push(name);
        let fields = self.resolve(fragment.fields.clone());
        self.active.pop();

        fields
    }
}
