//! Rubric catalog: the fixed set of evaluation criteria and their banded
//! exemplar descriptions.
//!
//! The catalog is built once at process start and never mutated. Criterion
//! order is display-significant only.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Score band carrying an exemplar description in the rubric.
///
/// Variant order is the rendering order (9, 7, 5, 3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Band {
    #[serde(rename = "Band 9")]
    Nine,
    #[serde(rename = "Band 7")]
    Seven,
    #[serde(rename = "Band 5")]
    Five,
    #[serde(rename = "Band 3")]
    Three,
}

impl Band {
    /// All exemplar bands in rendering order.
    pub const ALL: [Band; 4] = [Band::Nine, Band::Seven, Band::Five, Band::Three];

    /// Display label, e.g. `"Band 9"`.
    pub fn label(self) -> &'static str {
        match self {
            Band::Nine => "Band 9",
            Band::Seven => "Band 7",
            Band::Five => "Band 5",
            Band::Three => "Band 3",
        }
    }

    /// Numeric value of the band.
    pub fn value(self) -> f64 {
        match self {
            Band::Nine => 9.0,
            Band::Seven => 7.0,
            Band::Five => 5.0,
            Band::Three => 3.0,
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single evaluation criterion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Criterion {
    /// Snake-case key used in score and feedback maps (e.g. `task_response`).
    pub key: String,

    /// Human-readable name (e.g. `Task Response`).
    pub name: String,

    /// What the criterion measures.
    pub description: String,

    /// Exemplar description per band.
    pub exemplar_by_band: BTreeMap<Band, String>,
}

impl Criterion {
    /// Create a criterion with no exemplars.
    pub fn new(key: &str, name: &str, description: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            exemplar_by_band: BTreeMap::new(),
        }
    }

    /// Attach the exemplar text for `band`.
    pub fn with_exemplar(mut self, band: Band, text: &str) -> Self {
        self.exemplar_by_band.insert(band, text.to_string());
        self
    }

    /// Exemplar text for `band`, if defined.
    pub fn exemplar(&self, band: Band) -> Option<&str> {
        self.exemplar_by_band.get(&band).map(String::as_str)
    }
}

/// Ordered sequence of criteria.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RubricCatalog {
    pub criteria: Vec<Criterion>,
}

impl RubricCatalog {
    /// Create a catalog from criteria, preserving order.
    pub fn new(criteria: Vec<Criterion>) -> Self {
        Self { criteria }
    }

    /// The IELTS Writing Task 2 rubric: four criteria with exemplars at
    /// bands 9, 7, 5 and 3.
    pub fn ielts_writing() -> Self {
        Self::new(vec![
            Criterion::new(
                "task_response",
                "Task Response",
                "Evaluates how well the essay addresses the prompt, develops arguments, and provides evidence.",
            )
            .with_exemplar(
                Band::Nine,
                "Fully addresses all aspects of the task. Strong arguments, excellent evidence, and insightful ideas.",
            )
            .with_exemplar(
                Band::Seven,
                "Covers all aspects well but may lack depth in argumentation.",
            )
            .with_exemplar(
                Band::Five,
                "Partially addresses the task. Some ideas underdeveloped or off-topic.",
            )
            .with_exemplar(
                Band::Three,
                "Minimal relevance to the topic. Arguments are unclear or missing.",
            ),
            Criterion::new(
                "coherence_and_cohesion",
                "Coherence & Cohesion",
                "Assesses logical flow, paragraphing, and the use of cohesive devices.",
            )
            .with_exemplar(
                Band::Nine,
                "Seamless logical flow. Exceptional paragraphing and diverse use of linking words.",
            )
            .with_exemplar(
                Band::Seven,
                "Good coherence with clear paragraphs. Some minor cohesion issues.",
            )
            .with_exemplar(
                Band::Five,
                "Some organizational issues. Limited use of linking words.",
            )
            .with_exemplar(
                Band::Three,
                "Lacks organization. No clear paragraphing or logical structure.",
            ),
            Criterion::new(
                "lexical_resource",
                "Lexical Resource",
                "Measures vocabulary range, precision, and appropriateness.",
            )
            .with_exemplar(
                Band::Nine,
                "Sophisticated vocabulary with precise word choice. Wide range of expressions.",
            )
            .with_exemplar(
                Band::Seven,
                "Good range of vocabulary, with occasional inappropriate word choices.",
            )
            .with_exemplar(
                Band::Five,
                "Limited vocabulary range, occasional awkward phrasing.",
            )
            .with_exemplar(
                Band::Three,
                "Very limited vocabulary. Many unnatural word choices.",
            ),
            Criterion::new(
                "grammatical_range_and_accuracy",
                "Grammatical Range & Accuracy",
                "Checks grammatical structures, sentence complexity, and accuracy.",
            )
            .with_exemplar(
                Band::Nine,
                "Flawless grammar with natural and complex structures.",
            )
            .with_exemplar(
                Band::Seven,
                "Generally accurate grammar with occasional errors in complex sentences.",
            )
            .with_exemplar(
                Band::Five,
                "Frequent grammar errors affecting clarity and readability.",
            )
            .with_exemplar(
                Band::Three,
                "Severe grammatical issues. Sentence construction is basic and often incorrect.",
            ),
        ])
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    /// Criterion keys in catalog order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.criteria.iter().map(|c| c.key.as_str())
    }

    /// Look up a criterion by key.
    pub fn get(&self, key: &str) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.key == key)
    }

    /// Check that the catalog can be rendered into a prompt.
    ///
    /// A catalog is well-formed when it is non-empty, every criterion has a
    /// key, name and description, keys are unique, and every criterion
    /// carries an exemplar for each of the four bands.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.criteria.is_empty() {
            return Err("rubric has no criteria".to_string());
        }
        for (i, criterion) in self.criteria.iter().enumerate() {
            if criterion.key.trim().is_empty() || criterion.name.trim().is_empty() {
                return Err(format!("criterion #{i} is missing a key or name"));
            }
            if criterion.description.trim().is_empty() {
                return Err(format!("criterion '{}' has no description", criterion.key));
            }
            if self.criteria[..i].iter().any(|c| c.key == criterion.key) {
                return Err(format!("duplicate criterion key '{}'", criterion.key));
            }
            for band in Band::ALL {
                if criterion.exemplar(band).is_none() {
                    return Err(format!(
                        "criterion '{}' has no exemplar for {}",
                        criterion.key, band
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ielts_catalog_has_four_criteria_in_display_order() {
        let catalog = RubricCatalog::ielts_writing();
        let keys: Vec<&str> = catalog.keys().collect();
        assert_eq!(
            keys,
            vec![
                "task_response",
                "coherence_and_cohesion",
                "lexical_resource",
                "grammatical_range_and_accuracy",
            ]
        );
        assert!(catalog.validate().is_ok());
    }

    #[test]
    fn test_band_order_is_nine_seven_five_three() {
        let labels: Vec<&str> = Band::ALL.iter().map(|b| b.label()).collect();
        assert_eq!(labels, vec!["Band 9", "Band 7", "Band 5", "Band 3"]);

        let mut sorted = vec![Band::Three, Band::Nine, Band::Five, Band::Seven];
        sorted.sort();
        assert_eq!(sorted, Band::ALL.to_vec());
    }

    #[test]
    fn test_band_serializes_as_label() {
        let json = serde_json::to_string(&Band::Seven).expect("serialize");
        assert_eq!(json, "\"Band 7\"");
    }

    #[test]
    fn test_empty_catalog_is_invalid() {
        let err = RubricCatalog::default().validate().unwrap_err();
        assert!(err.contains("no criteria"));
    }

    #[test]
    fn test_missing_exemplar_is_invalid() {
        let catalog = RubricCatalog::new(vec![Criterion::new(
            "task_response",
            "Task Response",
            "Addresses the prompt.",
        )
        .with_exemplar(Band::Nine, "Excellent.")
        .with_exemplar(Band::Seven, "Good.")
        .with_exemplar(Band::Five, "Partial.")]);

        let err = catalog.validate().unwrap_err();
        assert!(err.contains("Band 3"));
    }

    #[test]
    fn test_duplicate_key_is_invalid() {
        let mut catalog = RubricCatalog::ielts_writing();
        let dup = catalog.criteria[0].clone();
        catalog.criteria.push(dup);
        let err = catalog.validate().unwrap_err();
        assert!(err.contains("duplicate"));
    }

    #[test]
    fn test_catalog_serde_roundtrip() {
        let catalog = RubricCatalog::ielts_writing();
        let json = serde_json::to_string(&catalog).expect("serialize");
        let back: RubricCatalog = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(catalog, back);
    }
}
