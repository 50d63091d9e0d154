use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::prototype::{Node, ProtoField, Prototype};

/// Merges data read from the cache with data fetched for the fields that were missing.
///
/// The output follows the order of the prototype.  Fields found in the cache come from the
/// cached data and missing fields come from the fetched data, falling back to the other side
/// (and then to null) if the preferred side doesn't have a value.  Lists are joined element
/// by element.
pub fn join_responses(cached: &Value, fetched: &Value, prototype: &Prototype) -> Value {
    Value::Object(join_fields(Some(cached), Some(fetched), &prototype.fields))
}

/// Joins the fields of two objects.  Every field in `fields` ends up in the output, even if
/// neither side has it.
fn join_fields(
    cached: Option<&Value>,
    fetched: Option<&Value>,
    fields: &IndexMap<String, ProtoField>,
) -> Map<String, Value> {
    let mut joined = Map::new();

    for (key, field) in fields {
        let cached = cached.and_then(|value| value.get(key));
        let fetched = fetched.and_then(|value| value.get(key));

        let value = match field {
            ProtoField::Leaf(leaf) => {
                let (preferred, fallback) = if leaf.found {
                    (cached, fetched)
                } else {
                    (fetched, cached)
                };
                preferred.or(fallback).cloned().unwrap_or(Value::Null)
            }
            ProtoField::Node(node) => join_values(cached, fetched, node),
            ProtoField::Spread(_) => continue,
        };

        joined.insert(key.clone(), value);
    }

    joined
}

fn join_values(cached: Option<&Value>, fetched: Option<&Value>, node: &Node) -> Value {
    match (cached, fetched) {
        (Some(Value::Object(_)), Some(Value::Object(_)) | None) | (None, Some(Value::Object(_))) => {
            Value::Object(join_fields(cached, fetched, &node.children))
        }
        (Some(Value::Array(_)), Some(Value::Array(_)) | None) | (None, Some(Value::Array(_))) => {
            let cached = cached.and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();
            let fetched = fetched.and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();

            let len = cached.len().max(fetched.len());
            Value::Array(
                (0..len)
                    .map(|index| join_values(cached.get(index), fetched.get(index), node))
                    .collect(),
            )
        }
        (Some(cached), Some(fetched)) => {
            if node.is_satisfied() {
                cached.clone()
            } else {
                fetched.clone()
            }
        }
        (Some(value), None) | (None, Some(value)) => value.clone(),
        (None, None) => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use async_graphql_parser::parse_query;
    use serde_json::json;

    use super::*;
    use crate::{analyze, build_from_cache, Records, TypeMap};

    fn read(query: &str, records: Value) -> (Prototype, Value) {
        let type_map = TypeMap::new(
            [("getCharacter", "Character"), ("getPlanet", "Planet")],
            [("homeworld", "Planet"), ("friends", "[Character]")],
        );
        let document = parse_query(query).unwrap();
        let mut prototype = analyze(&document, &type_map, "_id").unwrap().prototype;
        let records: Records = serde_json::from_value(records).unwrap();

        let read = build_from_cache(&mut prototype, &records);
        (prototype, read.data)
    }

    #[test]
    fn test_join_nested_fields() {
        let (prototype, cached) = read(
            "{ getCharacter(_id: 1) { _id name homeworld { name climate } } }",
            json!({
                "character:1": {"_id": "1", "name": "Luke", "homeworld": {"__ref": "planet:1"}},
                "planet:1": {"name": "Tatooine"}
            }),
        );
        let fetched = json!({"getCharacter": {"homeworld": {"climate": "arid"}}});

        let joined = join_responses(&cached, &fetched, &prototype);

        insta::assert_json_snapshot!(joined, @r#"
        {
          "getCharacter": {
            "_id": "1",
            "name": "Luke",
            "homeworld": {
              "name": "Tatooine",
              "climate": "arid"
            }
          }
        }
        "#);
    }

    #[test]
    fn test_join_multiple_roots() {
        let (prototype, cached) = read(
            "{ getPlanet(_id: 1) { name } getCharacter(_id: 1) { name mass } }",
            json!({
                "character:1": {"name": "Luke"}
            }),
        );
        let fetched = json!({
            "getPlanet": {"name": "Tatooine"},
            "getCharacter": {"mass": 77}
        });

        let joined = join_responses(&cached, &fetched, &prototype);

        insta::assert_json_snapshot!(joined, @r#"
        {
          "getPlanet": {
            "name": "Tatooine"
          },
          "getCharacter": {
            "name": "Luke",
            "mass": 77
          }
        }
        "#);
    }

    #[test]
    fn test_join_lists_by_index() {
        let (prototype, cached) = read(
            "{ getCharacter(_id: 1) { friends { name mass } } }",
            json!({
                "character:1": {"friends": [{"__ref": "character:2"}, {"__ref": "character:3"}]},
                "character:2": {"name": "Leia"},
                "character:3": {"name": "Han"}
            }),
        );
        let fetched = json!({"getCharacter": {"friends": [{"mass": 49}, {"mass": 80}]}});

        let joined = join_responses(&cached, &fetched, &prototype);

        assert_eq!(
            joined,
            json!({
                "getCharacter": {
                    "friends": [{"name": "Leia", "mass": 49}, {"name": "Han", "mass": 80}]
                }
            })
        );
    }

    #[test]
    fn test_join_lists_of_different_lengths() {
        let (prototype, cached) = read(
            "{ getCharacter(_id: 1) { friends { _id name mass } } }",
            json!({
                "character:1": {"friends": [{"__ref": "character:2"}, {"__ref": "character:3"}]},
                "character:2": {"_id": "2", "name": "Leia"},
                "character:3": {"_id": "3", "name": "Han"}
            }),
        );
        let fetched = json!({"getCharacter": {"friends": [{"mass": 49}, {"mass": 80}, {"mass": 112}]}});

        let joined = join_responses(&cached, &fetched, &prototype);

        insta::assert_json_snapshot!(joined, @r#"
        {
          "getCharacter": {
            "friends": [
              {
                "_id": "2",
                "name": "Leia",
                "mass": 49
              },
              {
                "_id": "3",
                "name": "Han",
                "mass": 80
              },
              {
                "_id": null,
                "name": null,
                "mass": 112
              }
            ]
          }
        }
        "#);
    }

    #[test]
    fn test_join_fills_fields_missing_from_both_sides() {
        let (prototype, cached) = read(
            "{ getCharacter(_id: 1) { name homeworld { name climate } } getPlanet(_id: 2) { name } }",
            json!({
                "character:1": {"name": "Luke"}
            }),
        );
        let fetched = json!({"getCharacter": {"homeworld": {"name": "Tatooine"}}});

        let joined = join_responses(&cached, &fetched, &prototype);

        assert_eq!(
            joined,
            json!({
                "getCharacter": {"name": "Luke", "homeworld": {"name": "Tatooine", "climate": null}},
                "getPlanet": {"name": null}
            })
        );
    }

    #[test]
    fn test_join_prefers_fetched_data_for_missing_nodes() {
        let (prototype, cached) = read(
            "{ getCharacter(_id: 1) { name homeworld { name } } }",
            json!({
                "character:1": {"name": "Luke", "homeworld": {"__ref": "planet:1"}}
            }),
        );
        let fetched = json!({"getCharacter": {"homeworld": {"name": "Tatooine"}}});

        let joined = join_responses(&cached, &fetched, &prototype);

        assert_eq!(
            joined,
            json!({"getCharacter": {"name": "Luke", "homeworld": {"name": "Tatooine"}}})
        );
    }

    #[test]
    fn test_join_keeps_cached_nulls() {
        let (prototype, cached) = read(
            "{ getCharacter(_id: 1) { name mass homeworld { name } } }",
            json!({
                "character:1": {"name": "Luke", "homeworld": null}
            }),
        );
        let fetched = json!({"getCharacter": {"mass": 77}});

        let joined = join_responses(&cached, &fetched, &prototype);

        assert_eq!(
            joined,
            json!({"getCharacter": {"name": "Luke", "mass": 77, "homeworld": null}})
        );
    }
}
