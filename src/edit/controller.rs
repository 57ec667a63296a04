use crate::core::{
    FieldKind, FieldValue, Indicator, Opportunity, OpportunityField, Phase, Result, StatusParse,
    TrackerError,
};
use crate::state::Patch;
use log::debug;

/// Draft held for the one cell being edited.
#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
    pub record_id: String,
    pub field: OpportunityField,
    pub draft: String,
    /// Validation message from the last rejected commit.
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum EditState {
    #[default]
    Idle,
    Editing(EditSession),
}

impl EditState {
    pub fn session(&self) -> Option<&EditSession> {
        match self {
            EditState::Idle => None,
            EditState::Editing(session) => Some(session),
        }
    }

    pub fn is_editing(&self) -> bool {
        matches!(self, EditState::Editing(_))
    }

    pub fn is_editing_cell(&self, record_id: &str, field: OpportunityField) -> bool {
        self.session()
            .is_some_and(|session| session.record_id == record_id && session.field == field)
    }
}

/// What happened to a previous draft when a new cell was activated.
#[derive(Debug, Clone, PartialEq)]
pub enum EditTransition {
    Started,
    /// The previous draft was cancelled without a write.
    Replaced(EditSession),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKey {
    Accept,
    Cancel,
    Char(char),
    Backspace,
}

#[derive(Debug, Clone, PartialEq)]
pub enum KeyOutcome {
    Committed(Patch),
    Cancelled(EditSession),
    /// The draft failed validation; the cell stays in edit mode.
    Rejected(TrackerError),
    DraftChanged,
    Ignored,
}

/// Edit-mode state machine for one view. At most one cell is in edit mode.
#[derive(Debug, Clone, Default)]
pub struct EditController {
    state: EditState,
}

impl EditController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    /// `Idle → Editing`, seeding the draft from the record's current value.
    /// An active draft elsewhere is cancelled first.
    pub fn begin(&mut self, record: &Opportunity, field: OpportunityField) -> Result<EditTransition> {
        if !field.is_draft_editable() {
            return Err(TrackerError::InvalidField(format!(
                "'{}' is chosen from a list, not edited as text",
                field
            )));
        }

        let transition = match self.cancel() {
            Some(previous) => EditTransition::Replaced(previous),
            None => EditTransition::Started,
        };
        self.state = EditState::Editing(EditSession {
            record_id: record.id.clone(),
            field,
            draft: record.edit_representation(field),
            error: None,
        });
        Ok(transition)
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) -> Result<()> {
        let session = self.session_mut()?;
        session.draft = draft.into();
        session.error = None;
        Ok(())
    }

    pub fn push_char(&mut self, c: char) -> Result<()> {
        let session = self.session_mut()?;
        session.draft.push(c);
        session.error = None;
        Ok(())
    }

    pub fn pop_char(&mut self) -> Result<()> {
        let session = self.session_mut()?;
        session.draft.pop();
        session.error = None;
        Ok(())
    }

    /// `Editing → Idle` with a write. On a validation failure the draft and
    /// the error stay on the session and no patch is produced.
    pub fn commit(&mut self) -> Result<Patch> {
        let session = self.session_mut()?;
        match coerce_draft(session.field, &session.draft) {
            Ok(value) => {
                let patch = Patch::new(session.record_id.clone(), session.field, value);
                self.state = EditState::Idle;
                Ok(patch)
            }
            Err(err) => {
                session.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// `Editing → Idle` without a write.
    pub fn cancel(&mut self) -> Option<EditSession> {
        match std::mem::take(&mut self.state) {
            EditState::Idle => None,
            EditState::Editing(session) => {
                debug!(
                    "Discarded draft for '{}'.{}",
                    session.record_id, session.field
                );
                Some(session)
            }
        }
    }

    /// One-shot commit for select-type fields; never enters `Editing`.
    pub fn select(
        &mut self,
        record_id: &str,
        field: OpportunityField,
        value: FieldValue,
    ) -> Result<Patch> {
        let value = validate_selection(field, value)?;
        self.cancel();
        Ok(Patch::new(record_id, field, value))
    }

    pub fn handle_key(&mut self, key: EditKey) -> KeyOutcome {
        if !self.state.is_editing() {
            return KeyOutcome::Ignored;
        }
        match key {
            EditKey::Accept => match self.commit() {
                Ok(patch) => KeyOutcome::Committed(patch),
                Err(err) => KeyOutcome::Rejected(err),
            },
            EditKey::Cancel => match self.cancel() {
                Some(session) => KeyOutcome::Cancelled(session),
                None => KeyOutcome::Ignored,
            },
            EditKey::Char(c) => match self.push_char(c) {
                Ok(()) => KeyOutcome::DraftChanged,
                Err(_) => KeyOutcome::Ignored,
            },
            EditKey::Backspace => match self.pop_char() {
                Ok(()) => KeyOutcome::DraftChanged,
                Err(_) => KeyOutcome::Ignored,
            },
        }
    }

    fn session_mut(&mut self) -> Result<&mut EditSession> {
        match &mut self.state {
            EditState::Editing(session) => Ok(session),
            EditState::Idle => Err(TrackerError::NotEditing),
        }
    }
}

/// Turns a draft into the value written for `field`.
pub fn coerce_draft(field: OpportunityField, draft: &str) -> Result<FieldValue> {
    let trimmed = draft.trim();
    match field.kind() {
        FieldKind::Numeric => {
            if trimmed.is_empty() {
                return Ok(FieldValue::Null);
            }
            match trimmed.parse::<f64>() {
                Ok(number) if number.is_finite() => Ok(FieldValue::Number(number)),
                _ => Err(TrackerError::validation(
                    field.column(),
                    format!("'{}' is not a number", trimmed),
                )),
            }
        }
        FieldKind::Text if field == OpportunityField::Name => {
            if trimmed.is_empty() {
                Err(TrackerError::validation(field.column(), "name cannot be empty"))
            } else {
                Ok(FieldValue::Text(trimmed.to_string()))
            }
        }
        FieldKind::Text => {
            if trimmed.is_empty() {
                Ok(FieldValue::Null)
            } else {
                Ok(FieldValue::Text(trimmed.to_string()))
            }
        }
        FieldKind::Select => Err(TrackerError::InvalidField(format!(
            "'{}' has no text draft",
            field
        ))),
    }
}

fn validate_selection(field: OpportunityField, value: FieldValue) -> Result<FieldValue> {
    let invalid = |message: String| TrackerError::validation(field.column(), message);
    match (field, value) {
        (field, _) if field.kind() != FieldKind::Select => Err(TrackerError::InvalidField(
            format!("'{}' is edited as text, not selected", field),
        )),
        (OpportunityField::Phase, FieldValue::Integer(number)) => {
            Ok(FieldValue::Integer(Phase::try_from(number)?.number()))
        }
        (OpportunityField::Status, FieldValue::Text(raw)) => match StatusParse::parse(&raw) {
            StatusParse::Known(status) => Ok(FieldValue::Text(status.key().to_string())),
            StatusParse::Unknown(raw) => Err(invalid(format!("'{}' is not a known status", raw))),
        },
        (OpportunityField::Indicator(_), FieldValue::Text(raw)) => match Indicator::parse(&raw) {
            Some(indicator) => Ok(FieldValue::Text(indicator.key().to_string())),
            None => Err(invalid(format!("'{}' is not green, amber or red", raw))),
        },
        (OpportunityField::CompanyId, FieldValue::Text(id)) if !id.trim().is_empty() => {
            Ok(FieldValue::Text(id))
        }
        (OpportunityField::Company, value @ (FieldValue::Text(_) | FieldValue::Null)) => Ok(value),
        (OpportunityField::TargetDate, value @ (FieldValue::Date(_) | FieldValue::Null)) => {
            Ok(value)
        }
        (field, value) => Err(invalid(format!("cannot select {:?} for {}", value, field))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::IndicatorKind;

    #[test]
    fn numeric_drafts_parse_or_null() {
        assert_eq!(
            coerce_draft(OpportunityField::EstimatedSom, " 1250.5 ").unwrap(),
            FieldValue::Number(1250.5)
        );
        assert_eq!(
            coerce_draft(OpportunityField::EstimatedSom, "").unwrap(),
            FieldValue::Null
        );
        assert!(coerce_draft(OpportunityField::EstimatedSom, "12k").is_err());
        assert!(coerce_draft(OpportunityField::EstimatedSom, "inf").is_err());
    }

    #[test]
    fn optional_text_drafts_clear_to_null() {
        assert_eq!(
            coerce_draft(OpportunityField::NextSteps, "   ").unwrap(),
            FieldValue::Null
        );
    }

    #[test]
    fn select_normalizes_status_keys() {
        let mut controller = EditController::new();
        let patch = controller
            .select(
                "opp-1",
                OpportunityField::Status,
                FieldValue::Text("In Progress".to_string()),
            )
            .unwrap();
        assert_eq!(patch.value, FieldValue::Text("in_progress".to_string()));
    }

    #[test]
    fn select_rejects_draft_fields_and_bad_values() {
        let mut controller = EditController::new();
        assert!(matches!(
            controller.select("a", OpportunityField::Name, FieldValue::Text("x".into())),
            Err(TrackerError::InvalidField(_))
        ));
        assert!(matches!(
            controller.select(
                "a",
                OpportunityField::Indicator(IndicatorKind::Messaging),
                FieldValue::Text("purple".into())
            ),
            Err(TrackerError::Validation { .. })
        ));
    }

    #[test]
    fn keys_are_ignored_while_idle() {
        let mut controller = EditController::new();
        assert_eq!(controller.handle_key(EditKey::Accept), KeyOutcome::Ignored);
        assert_eq!(controller.handle_key(EditKey::Char('x')), KeyOutcome::Ignored);
    }
}
