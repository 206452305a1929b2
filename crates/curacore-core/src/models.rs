//! Request and response bodies of the CuraCore backend

use crate::identity::Role;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, Deserialize)]
pub struct Transcription {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignupConfirmation {
    pub user_id: i64,
    pub role: Role,
}

/// User record from `GET /auth/profile/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub full_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    pub role: Role,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub blood_group: Option<String>,
}

/// Nullable text columns read as empty strings
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Doctor {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub full_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub specialization: String,
    #[serde(default)]
    pub qualification: Option<String>,
    #[serde(default)]
    pub experience_years: Option<u32>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub consultation_fee: Option<u32>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Doctor {
    /// Case-insensitive match on name or specialization; an empty term matches all
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || self.full_name.to_lowercase().contains(&term)
            || self.specialization.to_lowercase().contains(&term)
    }
}

/// Doctors whose name or specialization contains `term`
pub fn filter_doctors<'a>(doctors: &'a [Doctor], term: &str) -> Vec<&'a Doctor> {
    doctors.iter().filter(|d| d.matches(term)).collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    pub doctor_id: i64,
    pub patient_id: i64,
    pub symptoms: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfirmation {
    pub id: i64,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl AppointmentStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "Pending",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
            AppointmentStatus::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
    #[serde(default)]
    pub appointment_date: Option<String>,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub symptoms: Option<String>,
    #[serde(default)]
    pub ai_summary: Option<String>,
}

impl Appointment {
    /// Calendar date of the booking, e.g. "2025-01-31"
    pub fn booked_on(&self) -> Option<&str> {
        self.appointment_date
            .as_deref()
            .map(|d| d.split('T').next().unwrap_or(d))
    }

    /// First `max_chars` characters of the AI summary, with an ellipsis if cut
    pub fn summary_preview(&self, max_chars: usize) -> Option<String> {
        let summary = self.ai_summary.as_deref()?;
        if summary.chars().count() <= max_chars {
            return Some(summary.to_string());
        }
        let head: String = summary.chars().take(max_chars).collect();
        Some(format!("{}...", head))
    }
}
