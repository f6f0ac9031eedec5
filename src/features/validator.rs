//! Inbound request validation

use serde_json::{Map, Value};

use super::patient::{FieldSpec, FieldType, PatientFeatures, FEATURE_NAMES, FIELD_SPECS, N_FEATURES};
use crate::error::ValidationError;

/// Validate a raw JSON request body.
///
/// The body must be an object holding exactly the eight patient fields.
/// Fields are checked in canonical order and the first failure is returned.
pub fn validate(raw: &Value) -> Result<PatientFeatures, ValidationError> {
    let fields = raw
        .as_object()
        .ok_or_else(|| ValidationError::malformed("request body must be a JSON object"))?;
    validate_fields(fields)
}

/// Validate an already-parsed field map
pub fn validate_fields(fields: &Map<String, Value>) -> Result<PatientFeatures, ValidationError> {
    let mut values = [0.0_f64; N_FEATURES];
    for (slot, spec) in values.iter_mut().zip(FIELD_SPECS.iter()) {
        let raw = fields
            .get(spec.name)
            .ok_or_else(|| ValidationError::missing(spec.name))?;
        *slot = check_field(spec, raw)?;
    }

    if let Some(unknown) = fields.keys().find(|k| !FEATURE_NAMES.contains(&k.as_str())) {
        return Err(ValidationError::unknown(unknown));
    }

    Ok(PatientFeatures {
        pregnancies: values[0] as u32,
        glucose: values[1],
        blood_pressure: values[2],
        skin_thickness: values[3],
        insulin: values[4],
        bmi: values[5],
        diabetes_pedigree: values[6],
        age: values[7] as u32,
    })
}

fn check_field(spec: &FieldSpec, raw: &Value) -> Result<f64, ValidationError> {
    let value = match raw {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
    .filter(|v| v.is_finite());

    let value = match (value, spec.field_type) {
        (None, FieldType::Integer) => return Err(ValidationError::type_mismatch(spec.name, "an integer")),
        (None, FieldType::Float) => return Err(ValidationError::type_mismatch(spec.name, "a number")),
        (Some(v), FieldType::Integer) if v.fract() != 0.0 => {
            return Err(ValidationError::type_mismatch(spec.name, "an integer"))
        }
        (Some(v), _) => v,
    };

    if !spec.bound.admits(value) {
        return Err(ValidationError::out_of_range(spec.name, value, spec.bound.describe()));
    }
    if spec.field_type == FieldType::Integer && value > u32::MAX as f64 {
        return Err(ValidationError::out_of_range(spec.name, value, "a 32-bit integer"));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationErrorKind;
    use serde_json::json;

    fn valid_body() -> Value {
        json!({
            "pregnancies": 2,
            "glucose": 120,
            "blood_pressure": 70,
            "skin_thickness": 25,
            "insulin": 100,
            "bmi": 28.5,
            "diabetes_pedigree": 0.5,
            "age": 35
        })
    }

    #[test]
    fn test_valid_request() {
        let features = validate(&valid_body()).unwrap();
        assert_eq!(features.pregnancies, 2);
        assert_eq!(features.glucose, 120.0);
        assert_eq!(features.bmi, 28.5);
        assert_eq!(features.age, 35);
    }

    #[test]
    fn test_each_missing_field_is_reported() {
        for name in FEATURE_NAMES {
            let mut body = valid_body();
            body.as_object_mut().unwrap().remove(name);
            let err = validate(&body).unwrap_err();
            assert_eq!(err.kind, ValidationErrorKind::MissingField);
            assert_eq!(err.field.as_deref(), Some(name));
        }
    }

    #[test]
    fn test_integer_fields_reject_fractions() {
        let mut body = valid_body();
        body["age"] = json!(35.5);
        let err = validate(&body).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::TypeMismatch);
        assert_eq!(err.field.as_deref(), Some("age"));

        // Integral floats are coerced
        body["age"] = json!(35.0);
        assert_eq!(validate(&body).unwrap().age, 35);
    }

    #[test]
    fn test_non_numeric_values_rejected() {
        for bad in [json!("120"), json!(null), json!(true), json!([1]), json!({"v": 1})] {
            let mut body = valid_body();
            body["glucose"] = bad;
            let err = validate(&body).unwrap_err();
            assert_eq!(err.kind, ValidationErrorKind::TypeMismatch);
            assert_eq!(err.field.as_deref(), Some("glucose"));
        }
    }

    #[test]
    fn test_negative_bmi_out_of_range() {
        let mut body = valid_body();
        body["bmi"] = json!(-5);
        let err = validate(&body).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::OutOfRange);
        assert_eq!(err.field.as_deref(), Some("bmi"));
        assert_eq!(err.value, Some(-5.0));
    }

    #[test]
    fn test_zero_bounds() {
        let mut body = valid_body();
        body["insulin"] = json!(0);
        body["pregnancies"] = json!(0);
        assert!(validate(&body).is_ok());

        body["age"] = json!(0);
        let err = validate(&body).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::OutOfRange);
        assert_eq!(err.field.as_deref(), Some("age"));

        let mut body = valid_body();
        body["diabetes_pedigree"] = json!(0.0);
        let err = validate(&body).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("diabetes_pedigree"));
    }

    #[test]
    fn test_negative_pregnancies_is_range_not_type() {
        let mut body = valid_body();
        body["pregnancies"] = json!(-1);
        let err = validate(&body).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::OutOfRange);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut body = valid_body();
        body["outcome"] = json!(1);
        let err = validate(&body).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::UnknownField);
        assert_eq!(err.field.as_deref(), Some("outcome"));
    }

    #[test]
    fn test_non_object_body() {
        let err = validate(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::MalformedRequest);
        assert!(err.field.is_none());
    }
}
