use crate::core::value::json_type_name;
use crate::core::{MockError, Result, Value};

/// One mock result row: an ordered field-name to value mapping.
///
/// Rows are what observers hand back through `QueryRecord::respond`; field
/// order is preserved so result columns come out the way the row was built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Set a field, replacing any existing value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        for field in &mut self.fields {
            if field.0 == name {
                field.1 = value;
                return;
            }
        }
        self.fields.push((name, value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<(String, Value)>> for Row {
    fn from(fields: Vec<(String, Value)>) -> Self {
        Self { fields }
    }
}

impl TryFrom<serde_json::Value> for Row {
    type Error = MockError;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Object(map) => {
                let mut row = Row::new();
                for (name, field) in map {
                    row.insert(name, Value::try_from(field)?);
                }
                Ok(row)
            }
            other => Err(MockError::TypeMismatch(format!(
                "A row must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }
}

impl serde::Serialize for Row {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Convert a JSON array of objects into mock rows.
///
/// This is the shape canned fixtures are usually written in:
///
/// ```
/// use querymock::rows_from_json;
///
/// let rows = rows_from_json(serde_json::json!([{ "id": 1, "foo": "bar" }])).unwrap();
/// assert_eq!(rows.len(), 1);
/// ```
pub fn rows_from_json(value: serde_json::Value) -> Result<Vec<Row>> {
    match value {
        serde_json::Value::Array(items) => items.into_iter().map(Row::try_from).collect(),
        other => Err(MockError::TypeMismatch(format!(
            "Expected a JSON array of row objects, got {}",
            json_type_name(&other)
        ))),
    }
}
