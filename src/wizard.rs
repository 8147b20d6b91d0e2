//! Multi-step submission wizards for complaints and recyclable pickup
//! requests: Details → Location/Pickup → Review. Forward navigation is
//! gated on the current step's validation; `back()` never validates.
//! The same field checks back the POST handlers, so a client that skips
//! the wizard still cannot submit an invalid record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Coordinates, NewComplaint, NewRecyclableItem, Priority};

/// Field-keyed validation errors, rendered inline by clients.
pub type FieldErrors = BTreeMap<String, String>;

const MIN_DESCRIPTION_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Details,
    Location,
    Review,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplaintDraft {
    pub title: String,
    pub description: String,
    pub priority: Option<Priority>,
    pub area: String,
    pub location: String,
    /// Stays at the `(0, 0)` sentinel until a pin is dropped on the map.
    pub coordinates: Coordinates,
    pub image_url: Option<String>,
}

fn check_complaint_details(
    errors: &mut FieldErrors,
    title: &str,
    description: &str,
    priority: Option<Priority>,
    area: &str,
) {
    if title.trim().is_empty() {
        errors.insert("title".into(), "Title is required".into());
    }
    if description.trim().is_empty() {
        errors.insert("description".into(), "Description is required".into());
    } else if description.len() < MIN_DESCRIPTION_LEN {
        errors.insert(
            "description".into(),
            format!("Description should be at least {MIN_DESCRIPTION_LEN} characters"),
        );
    }
    if priority.is_none() {
        errors.insert("priority".into(), "Priority is required".into());
    }
    if area.trim().is_empty() {
        errors.insert("area".into(), "Area is required".into());
    }
}

fn check_location(errors: &mut FieldErrors, location: &str, coordinates: Option<&Coordinates>) {
    if location.trim().is_empty() {
        errors.insert("location".into(), "Location description is required".into());
    }
    match coordinates {
        Some(c) if !c.is_unset() => {}
        _ => {
            errors.insert(
                "coordinates".into(),
                "Please select a location on the map".into(),
            );
        }
    }
}

/// Validate a complaint submission payload in full (the Review-step
/// check, also run by `POST /complaints`).
pub fn validate_new_complaint(new: &NewComplaint) -> FieldErrors {
    let mut errors = FieldErrors::new();
    check_complaint_details(
        &mut errors,
        &new.title,
        &new.description,
        Some(new.priority),
        &new.area,
    );
    check_location(&mut errors, &new.location, new.coordinates.as_ref());
    errors
}

#[derive(Debug, Clone)]
pub struct ComplaintWizard {
    step: Step,
    pub draft: ComplaintDraft,
}

impl Default for ComplaintWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl ComplaintWizard {
    pub fn new() -> Self {
        Self {
            step: Step::Details,
            draft: ComplaintDraft::default(),
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    /// Validate the current step; advance only when it is clean.
    pub fn next(&mut self) -> Result<Step, FieldErrors> {
        let mut errors = FieldErrors::new();
        match self.step {
            Step::Details => {
                check_complaint_details(
                    &mut errors,
                    &self.draft.title,
                    &self.draft.description,
                    self.draft.priority,
                    &self.draft.area,
                );
                if errors.is_empty() {
                    self.step = Step::Location;
                }
            }
            Step::Location => {
                check_location(&mut errors, &self.draft.location, Some(&self.draft.coordinates));
                if errors.is_empty() {
                    self.step = Step::Review;
                }
            }
            Step::Review => {}
        }
        if errors.is_empty() {
            Ok(self.step)
        } else {
            Err(errors)
        }
    }

    pub fn back(&mut self) {
        self.step = match self.step {
            Step::Details | Step::Location => Step::Details,
            Step::Review => Step::Location,
        };
    }

    /// Re-validate every step and produce the insert payload. Success
    /// resets the wizard to its initial state; failure leaves it on
    /// Review with the error map.
    pub fn submit(&mut self) -> Result<NewComplaint, FieldErrors> {
        let mut errors = FieldErrors::new();
        check_complaint_details(
            &mut errors,
            &self.draft.title,
            &self.draft.description,
            self.draft.priority,
            &self.draft.area,
        );
        check_location(&mut errors, &self.draft.location, Some(&self.draft.coordinates));
        if !errors.is_empty() {
            self.step = Step::Review;
            return Err(errors);
        }
        let draft = std::mem::take(&mut self.draft);
        self.step = Step::Details;
        Ok(NewComplaint {
            title: draft.title,
            description: draft.description,
            location: draft.location,
            coordinates: Some(draft.coordinates),
            area: draft.area,
            priority: draft.priority.expect("validated above"),
            image_url: draft.image_url,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecyclableDraft {
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub area: String,
    pub location: String,
    pub image_url: Option<String>,
}

fn check_item_details(errors: &mut FieldErrors, name: &str, quantity: i32, area: &str) {
    if name.trim().is_empty() {
        errors.insert("name".into(), "Item name is required".into());
    }
    if quantity < 1 {
        errors.insert("quantity".into(), "Quantity must be at least 1".into());
    }
    if area.trim().is_empty() {
        errors.insert("area".into(), "Area is required".into());
    }
}

fn check_pickup(errors: &mut FieldErrors, location: &str) {
    if location.trim().is_empty() {
        errors.insert("location".into(), "Pickup location is required".into());
    }
}

/// Full validation for a recyclable-item payload (`POST /recyclables`).
pub fn validate_new_item(new: &NewRecyclableItem) -> FieldErrors {
    let mut errors = FieldErrors::new();
    check_item_details(&mut errors, &new.name, new.quantity, &new.area);
    check_pickup(&mut errors, &new.location);
    errors
}

#[derive(Debug, Clone)]
pub struct RecyclableWizard {
    step: Step,
    pub draft: RecyclableDraft,
}

impl Default for RecyclableWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl RecyclableWizard {
    pub fn new() -> Self {
        Self {
            step: Step::Details,
            draft: RecyclableDraft::default(),
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn next(&mut self) -> Result<Step, FieldErrors> {
        let mut errors = FieldErrors::new();
        match self.step {
            Step::Details => {
                check_item_details(
                    &mut errors,
                    &self.draft.name,
                    self.draft.quantity,
                    &self.draft.area,
                );
                if errors.is_empty() {
                    self.step = Step::Location;
                }
            }
            Step::Location => {
                check_pickup(&mut errors, &self.draft.location);
                if errors.is_empty() {
                    self.step = Step::Review;
                }
            }
            Step::Review => {}
        }
        if errors.is_empty() {
            Ok(self.step)
        } else {
            Err(errors)
        }
    }

    pub fn back(&mut self) {
        self.step = match self.step {
            Step::Details | Step::Location => Step::Details,
            Step::Review => Step::Location,
        };
    }

    pub fn submit(&mut self) -> Result<NewRecyclableItem, FieldErrors> {
        let mut errors = FieldErrors::new();
        check_item_details(
            &mut errors,
            &self.draft.name,
            self.draft.quantity,
            &self.draft.area,
        );
        check_pickup(&mut errors, &self.draft.location);
        if !errors.is_empty() {
            self.step = Step::Review;
            return Err(errors);
        }
        let draft = std::mem::take(&mut self.draft);
        self.step = Step::Details;
        Ok(NewRecyclableItem {
            name: draft.name,
            description: draft.description,
            quantity: draft.quantity,
            location: draft.location,
            area: draft.area,
            image_url: draft.image_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_draft() -> ComplaintDraft {
        ComplaintDraft {
            title: "Overflowing bin".into(),
            description: "Bin has been overflowing for 3 days near the park entrance".into(),
            priority: Some(Priority::High),
            area: "bopal".into(),
            location: "Park Street".into(),
            coordinates: Coordinates {
                lat: 23.01,
                lng: 72.51,
            },
            image_url: None,
        }
    }

    #[test]
    fn blank_title_blocks_details_step() {
        let mut wizard = ComplaintWizard::new();
        wizard.draft = filled_draft();
        wizard.draft.title = "".into();
        let errors = wizard.next().unwrap_err();
        assert!(errors.contains_key("title"));
        assert_eq!(wizard.step(), Step::Details);
    }

    #[test]
    fn short_description_blocks_details_step() {
        let mut wizard = ComplaintWizard::new();
        wizard.draft = filled_draft();
        wizard.draft.description = "too short".into();
        let errors = wizard.next().unwrap_err();
        assert!(errors.contains_key("description"));
    }

    #[test]
    fn unset_coordinates_block_location_step() {
        let mut wizard = ComplaintWizard::new();
        wizard.draft = filled_draft();
        wizard.draft.coordinates = Coordinates::default();
        assert_eq!(wizard.next().unwrap(), Step::Location);
        let errors = wizard.next().unwrap_err();
        assert!(errors.contains_key("coordinates"));
        assert_eq!(wizard.step(), Step::Location);
    }

    #[test]
    fn full_flow_resets_after_submit() {
        let mut wizard = ComplaintWizard::new();
        wizard.draft = filled_draft();
        assert_eq!(wizard.next().unwrap(), Step::Location);
        assert_eq!(wizard.next().unwrap(), Step::Review);
        let payload = wizard.submit().expect("valid draft");
        assert_eq!(payload.title, "Overflowing bin");
        assert_eq!(payload.priority, Priority::High);
        // wizard returned to its initial state
        assert_eq!(wizard.step(), Step::Details);
        assert!(wizard.draft.title.is_empty());
    }

    #[test]
    fn back_never_validates() {
        let mut wizard = ComplaintWizard::new();
        wizard.draft = filled_draft();
        wizard.next().unwrap();
        wizard.draft.title = "".into();
        wizard.back();
        assert_eq!(wizard.step(), Step::Details);
    }

    #[test]
    fn failed_submit_lands_on_review() {
        let mut wizard = ComplaintWizard::new();
        wizard.draft = filled_draft();
        wizard.draft.area = "".into();
        let errors = wizard.submit().unwrap_err();
        assert!(errors.contains_key("area"));
        assert_eq!(wizard.step(), Step::Review);
    }

    #[test]
    fn recyclable_quantity_must_be_positive() {
        let mut wizard = RecyclableWizard::new();
        wizard.draft = RecyclableDraft {
            name: "Cardboard boxes".into(),
            description: None,
            quantity: 0,
            area: "south bopal".into(),
            location: "Block C".into(),
            image_url: None,
        };
        let errors = wizard.next().unwrap_err();
        assert!(errors.contains_key("quantity"));
    }

    #[test]
    fn payload_validators_match_wizard_rules() {
        let new = NewComplaint {
            title: "Overflowing bin".into(),
            description: "short".into(),
            location: "".into(),
            coordinates: None,
            area: "bopal".into(),
            priority: Priority::Low,
            image_url: None,
        };
        let errors = validate_new_complaint(&new);
        assert!(errors.contains_key("description"));
        assert!(errors.contains_key("location"));
        assert!(errors.contains_key("coordinates"));
        assert!(!errors.contains_key("title"));
    }
}
