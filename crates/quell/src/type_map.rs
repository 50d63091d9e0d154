use std::{
    collections::{HashMap, HashSet},
    fmt,
};

/// The name of the root query type, as known to the type map.
pub(crate) const ROOT_TYPE: &str = "query";

/// Maps the fields of a query onto the entity types they resolve to.
///
/// Everything in here is lower-cased on the way in, so lookups are case-insensitive.  The
/// caller's maps are copied rather than normalized in place.
#[derive(Clone, Debug, Default)]
pub struct TypeMap {
    queries: HashMap<String, TypeRef>,
    fields: HashMap<String, TypeRef>,
    known_types: HashSet<String>,
}

impl TypeMap {
    /// Builds a type map from root query names -> types and nested field names -> types.
    ///
    /// Types are written as `Character`, `Character!`, `[Character]` and so on.
    pub fn new(
        queries: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>,
        fields: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>,
    ) -> Self {
        let queries = lowercase_entries(queries);
        let fields = lowercase_entries(fields);

        let known_types = queries
            .values()
            .chain(fields.values())
            .map(|ty| ty.name.clone())
            .chain(std::iter::once(ROOT_TYPE.to_string()))
            .collect();

        TypeMap {
            queries,
            fields,
            known_types,
        }
    }

    /// The type a root query field resolves to
    pub fn root_type(&self, field_name: &str) -> Option<&TypeRef> {
        self.queries.get(&field_name.to_lowercase())
    }

    /// The type a nested field resolves to
    pub fn field_type(&self, field_name: &str) -> Option<&TypeRef> {
        self.fields.get(&field_name.to_lowercase())
    }

    /// The canonical name of a type used in a type condition, if we know about it.
    pub fn canonical_type(&self, type_name: &str) -> Option<&str> {
        self.known_types
            .get(&type_name.to_lowercase())
            .map(String::as_str)
    }
}

fn lowercase_entries<I, K, V>(entries: I) -> HashMap<String, TypeRef>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    entries
        .into_iter()
        .map(|(key, value)| (key.as_ref().to_lowercase(), TypeRef::parse(value.as_ref())))
        .collect()
}

/// A reference to an entity type, possibly wrapped in a list.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeRef {
    name: String,
    list: bool,
}

impl TypeRef {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim().trim_end_matches('!');
        let (inner, list) = match trimmed.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            Some(inner) => (inner.trim().trim_end_matches('!'), true),
            None => (trimmed, false),
        };

        TypeRef {
            name: inner.trim().to_lowercase(),
            list,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_list(&self) -> bool {
        self.list
    }

    /// The store key of the entity of this type with the given identifier
    pub fn cache_key(&self, id: &str) -> String {
        format!("{}:{id}", self.name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.list {
            write!(f, "[{}]", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookups_are_case_insensitive() {
        let map = TypeMap::new([("getCharacter", "Character")], [("homeworld", "Planet")]);

        assert_eq!(map.root_type("GETCHARACTER").map(TypeRef::name), Some("character"));
        assert_eq!(map.field_type("HomeWorld").map(TypeRef::name), Some("planet"));
        assert_eq!(map.canonical_type("PLANET"), Some("planet"));
        assert_eq!(map.canonical_type("Query"), Some("query"));
        assert_eq!(map.canonical_type("Starship"), None);
    }

    #[test]
    fn test_caller_maps_are_left_alone() {
        let queries = HashMap::from([("getCharacter".to_string(), "Character".to_string())]);
        let map = TypeMap::new(&queries, HashMap::<String, String>::new());

        assert!(map.root_type("getcharacter").is_some());
        assert!(queries.contains_key("getCharacter"));
        assert_eq!(queries["getCharacter"], "Character");
    }

    #[test]
    fn test_type_ref_parsing() {
        assert_eq!(TypeRef::parse("Character").to_string(), "character");
        assert_eq!(TypeRef::parse("Character!").to_string(), "character");
        assert_eq!(TypeRef::parse("[Character]").to_string(), "[character]");
        assert_eq!(TypeRef::parse("[Character!]!").to_string(), "[character]");
        assert_eq!(TypeRef::parse("Character").cache_key("1"), "character:1");
    }
}
