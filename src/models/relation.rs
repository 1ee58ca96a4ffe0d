use serde::{Deserialize, Deserializer, Serialize};

/// An embedded relation as returned by the query client.
///
/// Depending on the foreign key the same selection comes back as a single
/// record, an array of records, or null. Everything past the data-access
/// boundary reads relations through [`Relation::first`] / [`Relation::all`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Relation<T> {
    Empty,
    // Arrays are tried before single records: a struct whose fields all
    // default would otherwise swallow `[]`.
    Many(Vec<T>),
    One(T),
}

impl<T> Default for Relation<T> {
    fn default() -> Self {
        Relation::Empty
    }
}

impl<T> Relation<T> {
    pub fn first(&self) -> Option<&T> {
        match self {
            Relation::Empty => None,
            Relation::One(value) => Some(value),
            Relation::Many(values) => values.first(),
        }
    }

    pub fn all(&self) -> Vec<&T> {
        match self {
            Relation::Empty => Vec::new(),
            Relation::One(value) => vec![value],
            Relation::Many(values) => values.iter().collect(),
        }
    }

    pub fn into_first(self) -> Option<T> {
        match self {
            Relation::Empty => None,
            Relation::One(value) => Some(value),
            Relation::Many(values) => values.into_iter().next(),
        }
    }
}

impl<T> From<Option<T>> for Relation<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Relation::Empty, Relation::One)
    }
}

impl<T> From<Vec<T>> for Relation<T> {
    fn from(values: Vec<T>) -> Self {
        Relation::Many(values)
    }
}

// Identifiers arrive as uuid strings from the hosted database but as integers
// from older demo data; both are carried as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Text(String),
    Int(i64),
}

impl From<IdRepr> for String {
    fn from(repr: IdRepr) -> Self {
        match repr {
            IdRepr::Text(text) => text,
            IdRepr::Int(n) => n.to_string(),
        }
    }
}

pub fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    IdRepr::deserialize(deserializer).map(String::from)
}

pub fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<IdRepr>::deserialize(deserializer)?
        .map(String::from)
        .filter(|id| !id.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Holder {
        #[serde(default)]
        rel: Relation<Named>,
    }

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Named {
        #[serde(deserialize_with = "de_id")]
        id: String,
    }

    #[test]
    fn relation_accepts_object_array_null_and_missing() {
        let one: Holder = serde_json::from_str(r#"{"rel": {"id": "a"}}"#).unwrap();
        assert_eq!(one.rel.first().map(|n| n.id.as_str()), Some("a"));

        let many: Holder = serde_json::from_str(r#"{"rel": [{"id": "b"}, {"id": "c"}]}"#).unwrap();
        assert_eq!(many.rel.first().map(|n| n.id.as_str()), Some("b"));
        assert_eq!(many.rel.all().len(), 2);

        let empty_array: Holder = serde_json::from_str(r#"{"rel": []}"#).unwrap();
        assert!(empty_array.rel.first().is_none());

        let null: Holder = serde_json::from_str(r#"{"rel": null}"#).unwrap();
        assert_eq!(null.rel, Relation::Empty);

        let missing: Holder = serde_json::from_str("{}").unwrap();
        assert!(missing.rel.all().is_empty());
    }

    #[test]
    fn numeric_ids_become_strings() {
        let named: Named = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        assert_eq!(named.id, "42");
    }
}
