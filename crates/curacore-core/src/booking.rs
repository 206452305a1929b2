//! Appointment booking form
//!
//! The acting patient always comes from the signed-in identity, never from
//! the form.

use crate::identity::{Identity, Role};
use crate::models::{Doctor, NewAppointment};

pub const DEFAULT_REASON: &str = "General Consultation";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingDraft {
    pub doctor_id: i64,
    pub doctor_name: String,
    pub symptoms: String,
}

impl BookingDraft {
    pub fn new(doctor: &Doctor) -> Self {
        Self {
            doctor_id: doctor.id,
            doctor_name: doctor.full_name.clone(),
            symptoms: DEFAULT_REASON.to_string(),
        }
    }

    pub fn prompt(&self) -> String {
        format!("Reason for visiting Dr. {}?", self.doctor_name)
    }

    /// Request body for `POST /appointments/`.
    ///
    /// `None` when the symptoms are blank (the user cancelled) or the
    /// identity is not a patient.
    pub fn to_request(&self, patient: &Identity) -> Option<NewAppointment> {
        let symptoms = self.symptoms.trim();
        if symptoms.is_empty() {
            return None;
        }
        match patient.role {
            Role::Patient => Some(NewAppointment {
                doctor_id: self.doctor_id,
                patient_id: patient.subject_id,
                symptoms: symptoms.to_string(),
            }),
            Role::Doctor => None,
        }
    }
}
