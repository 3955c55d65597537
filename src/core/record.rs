//! Corpus record model.
//!
//! A record is one (source code, compiler diagnostic) example. The external
//! JSON schema uses the `error_*` field names. Each record keeps the object it
//! was read from, and serializing a record writes that object back untouched,
//! so group files and deduplicated corpora carry the input verbatim.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

pub const ID_KEY: &str = "uuid";
pub const FALLBACK_ID_KEY: &str = "id";
pub const CATEGORY_KEY: &str = "error_type";
pub const SUBCATEGORY_KEY: &str = "error_type_detail";
pub const CODE_KEY: &str = "error_example_llm_code";
pub const DETAIL_KEY: &str = "error_example_llm_detail";

/// One corpus entry, immutable once loaded
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct Record
{
    /// Stable external identifier (not guaranteed unique)
    pub id: String,

    /// Error category (`error_type`)
    pub category: String,

    /// Error sub-category (`error_type_detail`)
    pub subcategory: String,

    /// Source snippet that triggered the diagnostic
    pub code_text: String,

    /// Compiler diagnostic output
    pub detail_text: String,

    /// The object this record was read from, key order included
    pub source: Map<String, Value>,
}

impl Record
{
    /// Build a record from its five semantic fields
    pub fn new(
        id: impl Into<String>,
        category: impl Into<String>,
        subcategory: impl Into<String>,
        code_text: impl Into<String>,
        detail_text: impl Into<String>,
    ) -> Self
    {
        let mut rec = Self {
            id: id.into(),
            category: category.into(),
            subcategory: subcategory.into(),
            code_text: code_text.into(),
            detail_text: detail_text.into(),
            source: Map::new(),
        };

        for (key, value) in [
            (ID_KEY, &rec.id),
            (CATEGORY_KEY, &rec.category),
            (SUBCATEGORY_KEY, &rec.subcategory),
            (CODE_KEY, &rec.code_text),
            (DETAIL_KEY, &rec.detail_text),
        ]
        {
            rec.source
                .insert(key.to_string(), Value::String(value.clone()));
        }
        rec
    }

    /// True when both records share the exact (category, subcategory) pair
    pub fn same_kind(
        &self,
        other: &Record,
    ) -> bool
    {
        self.category == other.category && self.subcategory == other.subcategory
    }

    /// Read an optional numeric side field (e.g. `diversity_score`), 0.0 if absent
    pub fn numeric_field(
        &self,
        name: &str,
    ) -> f64
    {
        self.source
            .get(name)
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    }
}

impl From<Map<String, Value>> for Record
{
    fn from(source: Map<String, Value>) -> Self
    {
        let field = |key: &str| {
            source
                .get(key)
                .map(lenient_string)
                .unwrap_or_default()
        };

        // `id` only stands in when `uuid` is absent or null
        let id = match source.get(ID_KEY)
        {
            Some(v) if !v.is_null() => lenient_string(v),
            _ => field(FALLBACK_ID_KEY),
        };

        Self {
            id,
            category: field(CATEGORY_KEY),
            subcategory: field(SUBCATEGORY_KEY),
            code_text: field(CODE_KEY),
            detail_text: field(DETAIL_KEY),
            source,
        }
    }
}

impl Serialize for Record
{
    fn serialize<S>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.source
            .serialize(serializer)
    }
}

/// Strings as-is, `null` as empty, other scalars stringified
fn lenient_string(value: &Value) -> String
{
    match value
    {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn maps_external_schema_and_keeps_extra_fields()
    {
        let raw = r#"{
            "uuid": "u-1",
            "error_type": "syntax",
            "error_type_detail": "missing_semicolon",
            "error_example_llm_code": "int main(){return 0}",
            "error_example_llm_detail": "a.cpp:1:20: error: expected ';'",
            "diversity_score": 0.5
        }"#;

        let rec: Record = serde_json::from_str(raw).unwrap();
        assert_eq!(rec.id, "u-1");
        assert_eq!(rec.category, "syntax");
        assert_eq!(rec.subcategory, "missing_semicolon");
        assert!(rec.code_text.starts_with("int main"));
        assert_eq!(rec.numeric_field("diversity_score"), 0.5);
        assert_eq!(rec.numeric_field("retention_ratio"), 0.0);

        let back = serde_json::to_value(&rec).unwrap();
        assert_eq!(back["uuid"], "u-1");
        assert_eq!(back["diversity_score"], 0.5);
    }

    #[test]
    fn missing_and_null_fields_default_to_empty()
    {
        let rec: Record = serde_json::from_str(r#"{"id": 7, "error_type": null}"#).unwrap();
        assert_eq!(rec.id, "7");
        assert_eq!(rec.category, "");
        assert_eq!(rec.subcategory, "");
        assert_eq!(rec.code_text, "");
    }

    #[test]
    fn uuid_wins_over_id_when_both_are_present()
    {
        let raw = r#"[{"id": 3, "uuid": "u-3", "error_type": "t", "error_type_detail": "d"}]"#;

        let recs: Vec<Record> = serde_json::from_str(raw).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].id, "u-3");
        assert_eq!(recs[0].category, "t");
        assert_eq!(recs[0].source["id"], 3);
    }

    #[test]
    fn null_uuid_falls_back_to_id()
    {
        let rec: Record = serde_json::from_str(r#"{"uuid": null, "id": "x"}"#).unwrap();
        assert_eq!(rec.id, "x");
    }

    #[test]
    fn writes_back_the_object_it_was_read_from()
    {
        let raw = r#"{"score":1,"uuid":5,"error_type":null}"#;

        let rec: Record = serde_json::from_str(raw).unwrap();
        assert_eq!(rec.id, "5");
        assert_eq!(serde_json::to_string(&rec).unwrap(), raw);
    }

    #[test]
    fn built_records_serialize_in_the_external_schema()
    {
        let rec = Record::new("a", "syntax", "semi", "int a;", "err");
        let back = serde_json::to_value(&rec).unwrap();

        assert_eq!(back["uuid"], "a");
        assert_eq!(back["error_type_detail"], "semi");
        assert_eq!(back["error_example_llm_code"], "int a;");

        let again: Record = serde_json::from_value(back).unwrap();
        assert_eq!(again, rec);
    }
}
