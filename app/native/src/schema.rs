//! JSON Schema generation for the Tapestry configuration file.

use crate::config::TapestryConfig;

/// URL the published schema is served from.
const SCHEMA_ID: &str =
    "https://raw.githubusercontent.com/tapestry-wall/tapestry/main/tapestry.schema.json";

/// Generates the JSON Schema for [`TapestryConfig`].
///
/// The schema includes every configuration option with its type, description
/// and default value.
#[must_use]
pub fn generate_schema() -> schemars::Schema {
    let mut schema = schemars::schema_for!(TapestryConfig);

    if let Some(obj) = schema.as_object_mut() {
        obj.insert("$id".to_string(), serde_json::json!(SCHEMA_ID));
    }

    schema
}

/// Returns the schema as pretty-printed JSON.
#[must_use]
pub fn print_schema() -> String {
    serde_json::to_string_pretty(&generate_schema()).unwrap_or_default()
}
