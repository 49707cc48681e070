//! The resolved schema registry (§4.6): one attribute schema and few-shot
//! example set per document class.

use idp_providers::{AttributeSchema, FewShotExample};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct ClassSchema {
    pub description: String,
    pub attributes: Vec<AttributeSchema>,
    pub few_shot: Vec<FewShotExample>,
}

#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    classes: HashMap<String, ClassSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, class: impl Into<String>, schema: ClassSchema) {
        self.classes.insert(class.into(), schema);
    }

    pub fn get(&self, class: &str) -> Option<&ClassSchema> {
        self.classes.get(class)
    }
}

/// Validate `value` against `schema`, coercing numeric-looking strings into
/// numbers where the field is typed `number`. Any other field type mismatch
/// is a structural error (§4.6 step 3).
pub fn validate_and_coerce(
    value: &mut serde_json::Value,
    schema: &ClassSchema,
) -> Result<(), String> {
    let obj = value
        .as_object_mut()
        .ok_or_else(|| "extraction result is not a JSON object".to_string())?;

    for attribute in &schema.attributes {
        let Some(field) = obj.get_mut(&attribute.name) else {
            continue;
        };
        if field.is_null() {
            continue;
        }
        let matches = match attribute.field_type.as_str() {
            "string" => field.is_string(),
            "number" => field.is_number(),
            "boolean" => field.is_boolean(),
            "array" => field.is_array(),
            "object" => field.is_object(),
            _ => true,
        };
        if matches {
            continue;
        }
        if attribute.field_type == "number" {
            if let Some(s) = field.as_str() {
                if let Ok(n) = s.parse::<f64>() {
                    if let Some(num) = serde_json::Number::from_f64(n) {
                        *field = serde_json::Value::Number(num);
                        continue;
                    }
                }
            }
        }
        return Err(format!(
            "field '{}' expected type '{}', got {}",
            attribute.name, attribute.field_type, field
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> ClassSchema {
        ClassSchema {
            description: "Invoice".to_string(),
            attributes: vec![
                AttributeSchema { name: "total".to_string(), description: "".to_string(), field_type: "number".to_string() },
                AttributeSchema { name: "vendor".to_string(), description: "".to_string(), field_type: "string".to_string() },
            ],
            few_shot: vec![],
        }
    }

    #[test]
    fn coerces_numeric_string() {
        let mut value = json!({"total": "42.5", "vendor": "Acme"});
        validate_and_coerce(&mut value, &schema()).unwrap();
        assert_eq!(value["total"], json!(42.5));
    }

    #[test]
    fn rejects_structural_mismatch() {
        let mut value = json!({"total": {"nested": true}, "vendor": "Acme"});
        assert!(validate_and_coerce(&mut value, &schema()).is_err());
    }

    #[test]
    fn missing_fields_are_allowed() {
        let mut value = json!({"vendor": "Acme"});
        assert!(validate_and_coerce(&mut value, &schema()).is_ok());
    }
}
