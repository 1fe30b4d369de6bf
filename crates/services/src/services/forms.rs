use std::collections::BTreeMap;

use chrono::NaiveDate;
use db::types::Urgency;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SHORT_DESCRIPTION_MAX: usize = 100;

/// Per-field validation messages, keyed the way clients render them.
/// Sub-form errors use an indexed path such as `notes[2].text`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Raw ticket submission, notes riding along as a sub-form set. The whole
/// document validates and saves together or not at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketForm {
    pub item_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub short_description: String,
    #[serde(default)]
    pub long_description: Option<String>,
    pub urgency: i16,
    #[serde(default)]
    pub technician_id: Option<Uuid>,
    #[serde(default)]
    pub recipient_emails: Option<String>,
    #[serde(default)]
    pub is_resolved: bool,
    #[serde(default)]
    pub resolution_notes: Option<String>,
    #[serde(default)]
    pub notes: Vec<NoteInput>,
    /// Save without emailing anyone.
    #[serde(default)]
    pub suppress_notification: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteInput {
    /// Present when editing or removing an existing note.
    #[serde(default)]
    pub id: Option<Uuid>,
    pub when: NaiveDate,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub remove: bool,
}

/// Cleaned values ready for persistence.
#[derive(Debug, Clone)]
pub struct CleanedTicket {
    pub item_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub short_description: String,
    pub long_description: Option<String>,
    pub urgency: Urgency,
    pub technician_id: Option<Uuid>,
    pub recipient_emails: Option<String>,
    pub is_resolved: bool,
    pub resolution_notes: Option<String>,
    pub notes: Vec<NoteOp>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteOp {
    Create { when: NaiveDate, text: String },
    Update { id: Uuid, when: NaiveDate, text: String },
    Delete { id: Uuid },
}

fn blank_to_none(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Splits a comma-separated recipient list, trimming entries and dropping
/// blanks. The field is free text; implausible entries are stored as
/// written and filtered by the dispatcher at send time, which leaves the
/// ticket with notifications effectively disabled rather than unsaveable.
fn clean_recipients(raw: &str) -> Option<String> {
    let cleaned: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.join(", "))
    }
}

impl TicketForm {
    pub fn validate(&self) -> Result<CleanedTicket, FieldErrors> {
        let mut errors = FieldErrors::default();

        let short_description = self.short_description.trim().to_string();
        if short_description.is_empty() {
            errors.push("short_description", "This field is required");
        } else if short_description.chars().count() > SHORT_DESCRIPTION_MAX {
            errors.push(
                "short_description",
                format!("Must be at most {SHORT_DESCRIPTION_MAX} characters"),
            );
        }

        let urgency = match Urgency::try_from(self.urgency) {
            Ok(urgency) => Some(urgency),
            Err(_) => {
                errors.push("urgency", "Urgency must be between 1 and 5");
                None
            }
        };

        let resolution_notes = blank_to_none(self.resolution_notes.as_deref());
        if self.is_resolved && resolution_notes.is_none() {
            errors.push(
                "resolution_notes",
                "Resolution notes are required when resolving a ticket",
            );
        }

        let recipient_emails = self.recipient_emails.as_deref().and_then(clean_recipients);

        let mut notes = Vec::new();
        for (index, note) in self.notes.iter().enumerate() {
            if note.remove {
                // Removing a note that was never saved is a no-op.
                if let Some(id) = note.id {
                    notes.push(NoteOp::Delete { id });
                }
                continue;
            }
            let text = note.text.trim().to_string();
            if text.is_empty() {
                errors.push(format!("notes[{index}].text"), "This field is required");
                continue;
            }
            match note.id {
                Some(id) => notes.push(NoteOp::Update {
                    id,
                    when: note.when,
                    text,
                }),
                None => notes.push(NoteOp::Create {
                    when: note.when,
                    text,
                }),
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(CleanedTicket {
            item_id: self.item_id,
            location_id: self.location_id,
            short_description,
            long_description: blank_to_none(self.long_description.as_deref()),
            // Checked above.
            urgency: urgency.unwrap(),
            technician_id: self.technician_id,
            recipient_emails,
            is_resolved: self.is_resolved,
            resolution_notes,
            notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_form() -> TicketForm {
        TicketForm {
            item_id: None,
            location_id: None,
            short_description: "projector lamp dead".to_string(),
            long_description: None,
            urgency: 3,
            technician_id: None,
            recipient_emails: None,
            is_resolved: false,
            resolution_notes: None,
            notes: vec![],
            suppress_notification: false,
        }
    }

    #[test]
    fn valid_form_cleans_and_converts_urgency() {
        let mut form = base_form();
        form.long_description = Some("   ".to_string());
        let cleaned = form.validate().unwrap();
        assert_eq!(cleaned.urgency, Urgency::Important);
        assert!(cleaned.long_description.is_none());
    }

    #[test]
    fn blank_short_description_is_rejected() {
        let mut form = base_form();
        form.short_description = "   ".to_string();
        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors.messages("short_description"),
            ["This field is required"]
        );
    }

    #[test]
    fn out_of_range_urgency_is_rejected() {
        for bad in [0i16, 6, -1] {
            let mut form = base_form();
            form.urgency = bad;
            let errors = form.validate().unwrap_err();
            assert!(!errors.messages("urgency").is_empty());
        }
    }

    #[test]
    fn resolving_requires_resolution_notes() {
        let mut form = base_form();
        form.is_resolved = true;
        let errors = form.validate().unwrap_err();
        assert!(!errors.messages("resolution_notes").is_empty());

        form.resolution_notes = Some("swapped the lamp".to_string());
        assert!(form.validate().is_ok());
    }

    #[test]
    fn note_errors_are_indexed() {
        let mut form = base_form();
        form.notes = vec![
            NoteInput {
                id: None,
                when: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
                text: "called the vendor".to_string(),
                remove: false,
            },
            NoteInput {
                id: None,
                when: NaiveDate::from_ymd_opt(2026, 4, 2).unwrap(),
                text: "  ".to_string(),
                remove: false,
            },
        ];
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.messages("notes[1].text"), ["This field is required"]);
    }

    #[test]
    fn removal_of_unsaved_note_is_dropped() {
        let mut form = base_form();
        form.notes = vec![NoteInput {
            id: None,
            when: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            text: String::new(),
            remove: true,
        }];
        let cleaned = form.validate().unwrap();
        assert!(cleaned.notes.is_empty());
    }

    #[test]
    fn recipients_are_normalized_but_stay_free_text() {
        let mut form = base_form();
        form.recipient_emails = Some(" a@example.edu ,, b@example.edu ".to_string());
        let cleaned = form.validate().unwrap();
        assert_eq!(
            cleaned.recipient_emails.as_deref(),
            Some("a@example.edu, b@example.edu")
        );

        // An implausible list is a valid save; the dispatcher skips it.
        form.recipient_emails = Some("the night custodian".to_string());
        let cleaned = form.validate().unwrap();
        assert_eq!(
            cleaned.recipient_emails.as_deref(),
            Some("the night custodian")
        );
    }
}
