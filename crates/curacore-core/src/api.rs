use crate::error::ApiError;
use crate::identity::Identity;
use crate::models::{
    Appointment, BookingConfirmation, ChatReply, ChatRequest, Doctor, LoginRequest, NewAppointment,
    Profile, SignupConfirmation, SignupRequest, Transcription,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8001/api";

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// HTTP client for the CuraCore backend
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Client whose requests give up after `timeout`
    pub fn with_timeout(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Ask the triage assistant. Each call is stateless: only `message` is sent.
    pub async fn send_chat(&self, message: &str) -> ApiResult<String> {
        let response = self
            .client
            .post(self.url("/chat/"))
            .json(&ChatRequest { message })
            .send()
            .await?;

        let reply: ChatReply = parse(response).await?;
        Ok(reply.reply)
    }

    pub async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> ApiResult<String> {
        let part = Part::bytes(audio)
            .file_name(file_name.to_string())
            .mime_str("audio/wav")?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("/voice/transcribe"))
            .multipart(form)
            .send()
            .await?;

        let transcription: Transcription = parse(response).await?;
        Ok(transcription.text)
    }

    /// Upload an audio file from disk for transcription
    pub async fn transcribe_file(&self, path: &Path) -> ApiResult<String> {
        let audio = tokio::fs::read(path).await.map_err(|source| ApiError::File {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("voice.wav");
        self.transcribe(audio, file_name).await
    }

    pub async fn login(&self, credentials: &LoginRequest) -> ApiResult<Identity> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(credentials)
            .send()
            .await?;
        parse(response).await
    }

    pub async fn signup(&self, request: &SignupRequest) -> ApiResult<SignupConfirmation> {
        let response = self
            .client
            .post(self.url("/auth/signup"))
            .json(request)
            .send()
            .await?;
        parse(response).await
    }

    pub async fn profile(&self, user_id: i64) -> ApiResult<Profile> {
        let response = self
            .client
            .get(self.url(&format!("/auth/profile/{}", user_id)))
            .send()
            .await?;
        parse(response).await
    }

    pub async fn doctors(&self) -> ApiResult<Vec<Doctor>> {
        let response = self.client.get(self.url("/doctors/")).send().await?;
        parse(response).await
    }

    pub async fn book_appointment(&self, request: &NewAppointment) -> ApiResult<BookingConfirmation> {
        let response = self
            .client
            .post(self.url("/appointments/"))
            .json(request)
            .send()
            .await?;
        parse(response).await
    }

    pub async fn doctor_queue(&self, doctor_id: i64) -> ApiResult<Vec<Appointment>> {
        let response = self
            .client
            .get(self.url(&format!("/appointments/doctor/{}", doctor_id)))
            .send()
            .await?;
        parse(response).await
    }

    pub async fn complete_appointment(&self, appointment_id: i64) -> ApiResult<()> {
        let response = self
            .client
            .put(self.url(&format!("/appointments/{}/complete", appointment_id)))
            .send()
            .await?;
        let _: serde_json::Value = parse(response).await?;
        Ok(())
    }

    pub async fn patient_history(&self, patient_id: i64) -> ApiResult<Vec<Appointment>> {
        let response = self
            .client
            .get(self.url(&format!("/appointments/patient/{}", patient_id)))
            .send()
            .await?;
        parse(response).await
    }
}

async fn parse<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let status = response.status();
    debug!(url = %response.url(), %status, "Backend response");

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::from_status(status, &body));
    }

    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
