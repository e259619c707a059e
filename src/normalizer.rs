//! Feature normalization for wine quality model inference.
//!
//! Canonicalizes an inbound feature mapping (transport casing, `ph`/`pH`
//! aliasing) into the exact ordered numeric vector the models were trained
//! on, rejecting incomplete or non-numeric input with an error that names
//! every offending field.

use serde_json::Value;

use crate::error::{FieldError, FieldErrorKind, ValidationError};

/// Number of physicochemical features per sample.
pub const FEATURE_COUNT: usize = 11;

/// Canonical field names, in training order.
pub const CANONICAL_NAMES: [&str; FEATURE_COUNT] = [
    "fixed_acidity",
    "volatile_acidity",
    "citric_acid",
    "residual_sugar",
    "chlorides",
    "free_sulfur_dioxide",
    "total_sulfur_dioxide",
    "density",
    "ph",
    "sulphates",
    "alcohol",
];

/// Display names used when formatting features for the explanation prompt.
pub const DISPLAY_NAMES: [&str; FEATURE_COUNT] = [
    "Fixed Acidity",
    "Volatile Acidity",
    "Citric Acid",
    "Residual Sugar",
    "Chlorides",
    "Free Sulfur Dioxide",
    "Total Sulfur Dioxide",
    "Density",
    "pH",
    "Sulphates",
    "Alcohol Content",
];

/// Accepted aliases per canonical field. The training data used spaces in
/// column names and `pH` capitalization; the API uses snake_case.
const ALIASES: [&[&str]; FEATURE_COUNT] = [
    &["fixed_acidity", "fixed acidity"],
    &["volatile_acidity", "volatile acidity"],
    &["citric_acid", "citric acid"],
    &["residual_sugar", "residual sugar"],
    &["chlorides"],
    &["free_sulfur_dioxide", "free sulfur dioxide"],
    &["total_sulfur_dioxide", "total sulfur dioxide"],
    &["density"],
    &["ph", "pH"],
    &["sulphates"],
    &["alcohol"],
];

/// Raw inbound feature mapping in transport casing.
pub type RawFeatures = serde_json::Map<String, Value>;

/// Ordered, validated numeric feature vector.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Build directly from training-order values. Intended for tests and
    /// internal callers; transport input goes through [`FeatureNormalizer`].
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Value of a canonical field, if the name is known.
    pub fn get(&self, canonical_name: &str) -> Option<f64> {
        CANONICAL_NAMES
            .iter()
            .position(|n| *n == canonical_name)
            .map(|i| self.values[i])
    }

    /// Iterate `(display_name, value)` pairs in training order.
    pub fn iter_display(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        DISPLAY_NAMES.iter().zip(self.values).map(|(n, v)| (*n, v))
    }
}

/// Translates transport-cased feature maps into canonical [`FeatureVector`]s.
pub struct FeatureNormalizer;

impl FeatureNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Canonicalize a raw feature mapping.
    ///
    /// Every canonical field must resolve from exactly one accepted alias
    /// and parse as a finite number. Negative values pass through; only the
    /// downstream model judges plausibility. There are no hidden defaults:
    /// a missing field is always an error.
    pub fn normalize(&self, raw: &RawFeatures) -> Result<FeatureVector, ValidationError> {
        let mut values = [0.0; FEATURE_COUNT];
        let mut errors = Vec::new();

        for (idx, aliases) in ALIASES.iter().enumerate() {
            let field = CANONICAL_NAMES[idx];
            let present: Vec<&Value> =
                aliases.iter().filter_map(|alias| raw.get(*alias)).collect();

            match present.as_slice() {
                [] => errors.push(FieldError {
                    field,
                    kind: FieldErrorKind::Missing,
                }),
                [value] => match numeric(value) {
                    Some(v) if v.is_finite() => values[idx] = v,
                    Some(_) => errors.push(FieldError {
                        field,
                        kind: FieldErrorKind::NotFinite,
                    }),
                    None => errors.push(FieldError {
                        field,
                        kind: FieldErrorKind::NotNumeric,
                    }),
                },
                _ => errors.push(FieldError {
                    field,
                    kind: FieldErrorKind::AmbiguousAlias,
                }),
            }
        }

        if errors.is_empty() {
            Ok(FeatureVector { values })
        } else {
            Err(ValidationError::new(errors))
        }
    }
}

impl Default for FeatureNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_input() -> RawFeatures {
        json!({
            "fixed_acidity": 7.4,
            "volatile_acidity": 0.7,
            "citric_acid": 0.0,
            "residual_sugar": 1.9,
            "chlorides": 0.076,
            "free_sulfur_dioxide": 11.0,
            "total_sulfur_dioxide": 34.0,
            "density": 0.9978,
            "ph": 3.51,
            "sulphates": 0.56,
            "alcohol": 9.4
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[test]
    fn test_normalizes_in_training_order() {
        let vector = FeatureNormalizer::new().normalize(&sample_input()).unwrap();

        assert_eq!(vector.as_slice().len(), FEATURE_COUNT);
        assert_eq!(vector.as_slice()[0], 7.4);
        assert_eq!(vector.get("ph"), Some(3.51));
        assert_eq!(vector.get("alcohol"), Some(9.4));
    }

    #[test]
    fn test_ph_alias_round_trips() {
        let lower = FeatureNormalizer::new().normalize(&sample_input()).unwrap();

        let mut upper_input = sample_input();
        let ph = upper_input.remove("ph").unwrap();
        upper_input.insert("pH".to_string(), ph);
        let upper = FeatureNormalizer::new().normalize(&upper_input).unwrap();

        assert_eq!(lower, upper);
    }

    #[test]
    fn test_space_separated_training_names_accepted() {
        let mut input = sample_input();
        let v = input.remove("fixed_acidity").unwrap();
        input.insert("fixed acidity".to_string(), v);

        let vector = FeatureNormalizer::new().normalize(&input).unwrap();
        assert_eq!(vector.get("fixed_acidity"), Some(7.4));
    }

    #[test]
    fn test_each_missing_field_is_named() {
        let normalizer = FeatureNormalizer::new();

        for field in CANONICAL_NAMES {
            let mut input = sample_input();
            input.remove(field);

            let err = normalizer.normalize(&input).unwrap_err();
            assert!(err.names_field(field), "expected error naming {field}");
            assert_eq!(err.field_errors.len(), 1);
        }
    }

    #[test]
    fn test_multiple_missing_fields_reported_together() {
        let mut input = sample_input();
        input.remove("density");
        input.remove("sulphates");
        input.remove("chlorides");

        let err = FeatureNormalizer::new().normalize(&input).unwrap_err();
        assert_eq!(err.field_errors.len(), 3);
        assert!(err.names_field("density"));
        assert!(err.names_field("sulphates"));
        assert!(err.names_field("chlorides"));
    }

    #[test]
    fn test_non_numeric_value_rejected() {
        let mut input = sample_input();
        input.insert("alcohol".to_string(), json!("strong"));

        let err = FeatureNormalizer::new().normalize(&input).unwrap_err();
        assert_eq!(err.field_errors.len(), 1);
        assert_eq!(err.field_errors[0].field, "alcohol");
        assert_eq!(err.field_errors[0].kind, FieldErrorKind::NotNumeric);
    }

    #[test]
    fn test_null_value_rejected() {
        let mut input = sample_input();
        input.insert("density".to_string(), Value::Null);

        let err = FeatureNormalizer::new().normalize(&input).unwrap_err();
        assert!(err.names_field("density"));
    }

    #[test]
    fn test_ambiguous_alias_rejected() {
        let mut input = sample_input();
        input.insert("pH".to_string(), json!(3.2));

        let err = FeatureNormalizer::new().normalize(&input).unwrap_err();
        assert_eq!(err.field_errors.len(), 1);
        assert_eq!(err.field_errors[0].field, "ph");
        assert_eq!(err.field_errors[0].kind, FieldErrorKind::AmbiguousAlias);
    }

    #[test]
    fn test_negative_values_pass_through() {
        let mut input = sample_input();
        input.insert("citric_acid".to_string(), json!(-0.1));

        let vector = FeatureNormalizer::new().normalize(&input).unwrap();
        assert_eq!(vector.get("citric_acid"), Some(-0.1));
    }

    #[test]
    fn test_display_iteration_matches_order() {
        let vector = FeatureNormalizer::new().normalize(&sample_input()).unwrap();
        let pairs: Vec<_> = vector.iter_display().collect();

        assert_eq!(pairs.len(), FEATURE_COUNT);
        assert_eq!(pairs[8], ("pH", 3.51));
        assert_eq!(pairs[10], ("Alcohol Content", 9.4));
    }
}
