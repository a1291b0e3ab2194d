// Submission rules for the transition form. Fail fast: the first broken rule wins.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{LeadTransition, Stage, TransitionField, TransitionPayload};

pub const DEFAULT_MIN_NOTES_LENGTH: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRules {
    pub min_notes_length: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            min_notes_length: DEFAULT_MIN_NOTES_LENGTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please add notes explaining this move")]
    NotesRequired,
    #[error("Notes must be at least {min} characters")]
    NotesTooShort { min: usize, actual: usize },
    #[error("Please select a lead type (MQL or SQL)")]
    LeadTypeRequired,
    #[error("Please provide a reason for this qualification")]
    ReasonRequired,
    #[error("Prospect value must be a non-negative number")]
    InvalidProspectValue { input: String },
}

impl ValidationError {
    /// The form field the message is shown against
    pub fn field(&self) -> TransitionField {
        match self {
            ValidationError::NotesRequired | ValidationError::NotesTooShort { .. } => {
                TransitionField::Notes
            }
            ValidationError::LeadTypeRequired => TransitionField::LeadType,
            ValidationError::ReasonRequired => TransitionField::Reason,
            ValidationError::InvalidProspectValue { .. } => TransitionField::ProspectValue,
        }
    }
}

/// TOFU→MOFU and MOFU→BOFU assert a lead-quality judgment
pub fn is_qualification_move(source: Option<Stage>, destination: Stage) -> bool {
    matches!(
        (source, destination),
        (Some(Stage::Tofu), Stage::Mofu) | (Some(Stage::Mofu), Stage::Bofu)
    )
}

/// Check the form and build the payload handed to the mover.
///
/// Rules run in order: notes present, notes long enough, lead type (qualification
/// only), reason (qualification only), prospect value if one was entered.
/// Notes and reason are measured after trimming surrounding whitespace. Notes
/// reach the payload exactly as typed.
pub fn validate(
    form: &LeadTransition,
    rules: &ValidationRules,
) -> Result<TransitionPayload, ValidationError> {
    let notes = form.notes.trim();
    if notes.is_empty() {
        return Err(ValidationError::NotesRequired);
    }
    let notes_len = notes.chars().count();
    if notes_len < rules.min_notes_length {
        return Err(ValidationError::NotesTooShort {
            min: rules.min_notes_length,
            actual: notes_len,
        });
    }

    let qualification = form.is_qualification_move();
    let reason = form.reason.trim();
    if qualification {
        if form.lead_type.is_none() {
            return Err(ValidationError::LeadTypeRequired);
        }
        if reason.is_empty() {
            return Err(ValidationError::ReasonRequired);
        }
    }

    let prospect_value = parse_prospect_value(&form.prospect_value)?;

    Ok(TransitionPayload {
        notes: form.notes.clone(),
        lead_type: if qualification { form.lead_type } else { None },
        prospect_value,
        reason: if qualification {
            Some(reason.to_string())
        } else {
            None
        },
    })
}

/// Blank input means "not provided"
fn parse_prospect_value(input: &str) -> Result<Option<f64>, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(Some(value)),
        _ => Err(ValidationError::InvalidProspectValue {
            input: input.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition::types::{LeadType, TransitionRequest};

    fn form(source: Option<Stage>, destination: Stage) -> LeadTransition {
        LeadTransition::open(TransitionRequest::new("Test Lead", source, destination))
    }

    #[test]
    fn test_qualification_moves() {
        assert!(is_qualification_move(Some(Stage::Tofu), Stage::Mofu));
        assert!(is_qualification_move(Some(Stage::Mofu), Stage::Bofu));
        assert!(!is_qualification_move(Some(Stage::Bofu), Stage::Customer));
        assert!(!is_qualification_move(Some(Stage::Tofu), Stage::Bofu));
        assert!(!is_qualification_move(None, Stage::Mofu));
        assert!(!is_qualification_move(Some(Stage::Bofu), Stage::Mofu));
    }

    #[test]
    fn test_notes_required_before_length() {
        let f = form(Some(Stage::Bofu), Stage::Customer);
        assert_eq!(
            validate(&f, &ValidationRules::default()),
            Err(ValidationError::NotesRequired)
        );

        let mut f = form(Some(Stage::Bofu), Stage::Customer);
        f.notes = "   ".to_string();
        assert_eq!(
            validate(&f, &ValidationRules::default()),
            Err(ValidationError::NotesRequired)
        );
    }

    #[test]
    fn test_short_notes_rejected_for_every_length_below_minimum() {
        for len in 1..DEFAULT_MIN_NOTES_LENGTH {
            let mut f = form(Some(Stage::Bofu), Stage::Customer);
            f.notes = "x".repeat(len);
            let err = validate(&f, &ValidationRules::default()).unwrap_err();
            assert_eq!(
                err,
                ValidationError::NotesTooShort {
                    min: 10,
                    actual: len
                }
            );
            assert!(err.to_string().contains("at least 10 characters"));
        }

        let mut f = form(Some(Stage::Bofu), Stage::Customer);
        f.notes = "x".repeat(DEFAULT_MIN_NOTES_LENGTH);
        assert!(validate(&f, &ValidationRules::default()).is_ok());
    }

    #[test]
    fn test_min_notes_length_is_configurable() {
        let rules = ValidationRules {
            min_notes_length: 3,
        };
        let mut f = form(Some(Stage::Bofu), Stage::Customer);
        f.notes = "ok!".to_string();
        assert!(validate(&f, &rules).is_ok());
    }

    #[test]
    fn test_qualification_requires_lead_type_then_reason() {
        let mut f = form(Some(Stage::Tofu), Stage::Mofu);
        f.notes = "Strong budget signal from call".to_string();
        assert_eq!(
            validate(&f, &ValidationRules::default()),
            Err(ValidationError::LeadTypeRequired)
        );

        f.lead_type = Some(LeadType::Sql);
        assert_eq!(
            validate(&f, &ValidationRules::default()),
            Err(ValidationError::ReasonRequired)
        );

        f.reason = "Demo booked".to_string();
        let payload = validate(&f, &ValidationRules::default()).unwrap();
        assert_eq!(payload.lead_type, Some(LeadType::Sql));
        assert_eq!(payload.reason.as_deref(), Some("Demo booked"));
    }

    #[test]
    fn test_non_qualification_drops_qualification_fields() {
        let mut f = form(Some(Stage::Bofu), Stage::Customer);
        f.notes = "Contract signed for annual plan".to_string();
        f.lead_type = Some(LeadType::Mql);
        f.reason = "leftover".to_string();

        let payload = validate(&f, &ValidationRules::default()).unwrap();
        assert_eq!(payload.lead_type, None);
        assert_eq!(payload.reason, None);
    }

    #[test]
    fn test_prospect_value_rules() {
        for bad in ["-1", "abc", "NaN", "inf", "12k"] {
            let mut f = form(Some(Stage::Bofu), Stage::Customer);
            f.notes = "Contract signed for annual plan".to_string();
            f.prospect_value = bad.to_string();
            assert!(
                matches!(
                    validate(&f, &ValidationRules::default()),
                    Err(ValidationError::InvalidProspectValue { .. })
                ),
                "expected {bad} to be rejected"
            );
        }

        let mut f = form(Some(Stage::Bofu), Stage::Customer);
        f.notes = "Contract signed for annual plan".to_string();
        f.prospect_value = " 0 ".to_string();
        assert_eq!(
            validate(&f, &ValidationRules::default()).unwrap().prospect_value,
            Some(0.0)
        );
        f.prospect_value = "12500.50".to_string();
        assert_eq!(
            validate(&f, &ValidationRules::default()).unwrap().prospect_value,
            Some(12500.5)
        );
    }

    #[test]
    fn test_prospect_value_checked_last() {
        let mut f = form(Some(Stage::Tofu), Stage::Mofu);
        f.notes = "Strong budget signal from call".to_string();
        f.prospect_value = "-5".to_string();
        assert_eq!(
            validate(&f, &ValidationRules::default()),
            Err(ValidationError::LeadTypeRequired)
        );
    }

    #[test]
    fn test_error_fields() {
        assert_eq!(ValidationError::NotesRequired.field(), TransitionField::Notes);
        assert_eq!(
            ValidationError::NotesTooShort { min: 10, actual: 2 }.field(),
            TransitionField::Notes
        );
        assert_eq!(ValidationError::LeadTypeRequired.field(), TransitionField::LeadType);
        assert_eq!(ValidationError::ReasonRequired.field(), TransitionField::Reason);
        assert_eq!(
            ValidationError::InvalidProspectValue { input: "x".into() }.field(),
            TransitionField::ProspectValue
        );
    }

    #[test]
    fn test_notes_sent_as_typed_but_measured_trimmed() {
        let mut f = form(Some(Stage::Bofu), Stage::Customer);
        f.notes = "  Signed.\n  ".to_string();
        assert_eq!(
            validate(&f, &ValidationRules::default()),
            Err(ValidationError::NotesTooShort { min: 10, actual: 7 })
        );

        f.notes = "Contract signed:\n- annual plan\n".to_string();
        let payload = validate(&f, &ValidationRules::default()).unwrap();
        assert_eq!(payload.notes, "Contract signed:\n- annual plan\n");
    }
}
