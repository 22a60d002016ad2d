//! The prescription scan pipeline: decode, analyse, store, account.

use std::sync::{Arc, LazyLock};
use std::time::Instant;

use actix_web::web;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::enums::str_enum;
use crate::models::prescription::AuditEntry;
use crate::services::images::ImageStore;
use crate::services::vision::{PrescriptionExtraction, VisionAnalyzer};
use crate::store::PrescriptionStore;
use crate::validation::{self as check, FieldErrors, Presence};

pub const MAX_IMAGE_BYTES: usize = 6 * 1024 * 1024;
pub const AUDIT_OPERATION: &str = "prescription_analysis";
const NOT_A_PRESCRIPTION: &str = "Could not identify as prescription";

static DATA_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^data:(image/(?:jpeg|png));base64,(.*)$").expect("data URL pattern compiles")
});

str_enum!(ImageType {
    Jpeg => "image/jpeg",
    Png => "image/png",
});

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeInput {
    #[serde(rename = "imageBase64")]
    pub image_base64: Option<String>,
    #[serde(rename = "fileName")]
    pub file_name: Option<String>,
    #[serde(rename = "fileType")]
    pub file_type: Option<String>,
}

#[derive(Debug)]
pub struct ScanRequest {
    data_url: String,
    file_name: String,
    file_type: ImageType,
}

impl AnalyzeInput {
    pub fn validate(self) -> Result<ScanRequest, FieldErrors> {
        let mut errors = FieldErrors::default();
        let data_url = check::text(&mut errors, "imageBase64", self.image_base64, Presence::Required, usize::MAX);
        let file_name = check::text(&mut errors, "fileName", self.file_name, Presence::Required, 255);
        let file_type = check::choice(&mut errors, "fileType", self.file_type, Presence::Optional);
        match (data_url, file_name) {
            (Some(data_url), Some(file_name)) if errors.is_empty() => Ok(ScanRequest {
                data_url,
                file_name,
                file_type: file_type.unwrap_or(ImageType::Jpeg),
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug)]
pub struct DecodedImage {
    pub mime: ImageType,
    pub bytes: Vec<u8>,
}

pub fn decode_data_url(data_url: &str, declared: ImageType) -> Result<DecodedImage, ApiError> {
    let captures = DATA_URL
        .captures(data_url)
        .ok_or_else(|| ApiError::UnsupportedMediaType("Unsupported image format".to_owned()))?;
    let mime: ImageType = captures[1]
        .to_ascii_lowercase()
        .parse()
        .map_err(|_| ApiError::UnsupportedMediaType("Unsupported image format".to_owned()))?;
    if mime != declared {
        return Err(ApiError::BadRequest("Image type does not match fileType".to_owned()));
    }
    let payload: String = captures[2].chars().filter(|ch| !ch.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(payload)
        .map_err(|_| ApiError::BadRequest("Invalid base64 image data".to_owned()))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Invalid base64 image data".to_owned()));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ApiError::PayloadTooLarge("Image exceeds the 6 MiB limit".to_owned()));
    }
    Ok(DecodedImage { mime, bytes })
}

/// `scan_<unix millis>_<9 base36 chars>`
pub fn session_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("scan_{}_{suffix}", Utc::now().timestamp_millis())
}

pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '.' || ch == '-' { ch } else { '_' })
        .collect()
}

pub fn upload_path(user: Uuid, file_name: &str) -> String {
    format!(
        "{user}/prescriptions/{}_{}",
        Utc::now().timestamp_millis(),
        sanitize_file_name(file_name)
    )
}

/// `200` body of a completed analysis.
#[derive(Debug, Serialize)]
pub struct ScanOutcome {
    pub success: bool,
    #[serde(rename = "isPrescription")]
    pub is_prescription: bool,
    pub data: Option<PrescriptionExtraction>,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "uploadedPath")]
    pub uploaded_path: String,
    pub cost: f64,
    pub processing_time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub struct ScanService {
    vision: Arc<dyn VisionAnalyzer>,
    images: Arc<dyn ImageStore>,
    audit: Arc<dyn PrescriptionStore>,
}

struct Completed {
    extraction: PrescriptionExtraction,
    uploaded_path: String,
    cost: f64,
}

impl ScanService {
    pub fn new(
        vision: Arc<dyn VisionAnalyzer>,
        images: Arc<dyn ImageStore>,
        audit: Arc<dyn PrescriptionStore>,
    ) -> Self {
        ScanService { vision, images, audit }
    }

    pub async fn analyze(&self, user: Uuid, request: ScanRequest) -> Result<ScanOutcome, ApiError> {
        let image = decode_data_url(&request.data_url, request.file_type)?;
        let session_id = session_id();
        let started = Instant::now();
        let request_data = json!({
            "imageProvided": true,
            "fileName": request.file_name,
            "imageSize": request.data_url.len(),
        });

        let result = self.run(user, &request, image).await;
        let processing_time = started.elapsed().as_millis() as u64;

        match result {
            Ok(done) => {
                let response_data = serde_json::to_value(&done.extraction).unwrap_or(Value::Null);
                self.record(user, &session_id, processing_time, request_data, Some(response_data), None, done.cost)
                    .await;
                tracing::info!(%user, session_id = %session_id, processing_time, cost = done.cost, "prescription analysed");
                let is_prescription = done.extraction.is_prescription;
                Ok(ScanOutcome {
                    success: true,
                    is_prescription,
                    data: is_prescription.then_some(done.extraction),
                    session_id,
                    uploaded_path: done.uploaded_path,
                    cost: done.cost,
                    processing_time,
                    reason: (!is_prescription).then(|| NOT_A_PRESCRIPTION.to_owned()),
                })
            }
            Err(reason) => {
                tracing::warn!(%user, session_id = %session_id, reason = %reason, "prescription analysis failed");
                self.record(user, &session_id, processing_time, request_data, None, Some(&reason), 0.0)
                    .await;
                Err(ApiError::Upstream {
                    message: "Analysis failed",
                    reason,
                })
            }
        }
    }

    async fn run(
        &self,
        user: Uuid,
        request: &ScanRequest,
        image: DecodedImage,
    ) -> Result<Completed, String> {
        let analysis = self
            .vision
            .analyze(&request.data_url)
            .await
            .map_err(|err| err.to_string())?;
        let cost = analysis.usage.cost();
        let path = upload_path(user, &request.file_name);
        let uploaded_path = self
            .images
            .upload(&path, image.bytes, image.mime.as_str())
            .await
            .map_err(|err| {
                tracing::error!(error = %err, path = %path, "prescription image upload failed");
                "Failed to upload prescription image".to_owned()
            })?;
        Ok(Completed {
            extraction: analysis.extraction,
            uploaded_path,
            cost,
        })
    }

    /// Writes the audit row; failures are logged and otherwise ignored.
    #[allow(clippy::too_many_arguments)]
    async fn record(
        &self,
        user: Uuid,
        session_id: &str,
        processing_time: u64,
        request_data: Value,
        response_data: Option<Value>,
        error: Option<&str>,
        cost: f64,
    ) {
        let now = Utc::now();
        let entry = AuditEntry {
            audit_id: Uuid::new_v4(),
            user_id: user,
            operation: AUDIT_OPERATION.to_owned(),
            success: error.is_none(),
            cost_incurred: cost,
            metadata: json!({
                "session_id": session_id,
                "processing_time": processing_time,
                "request_data": request_data,
                "response_data": response_data,
                "error": error,
                "timestamp": now.to_rfc3339(),
            }),
            created_at: now,
        };
        let store = Arc::clone(&self.audit);
        match web::block(move || store.log_ai_interaction(entry)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(error = %err, "could not write AI audit entry"),
            Err(err) => tracing::warn!(error = %err, "could not write AI audit entry"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIXEL: &str = "iVBORw0KGgo=";

    #[test]
    fn input_requires_image_and_name() {
        let errors = AnalyzeInput {
            image_base64: Some(String::new()),
            file_name: None,
            file_type: Some("image/gif".into()),
        }
        .validate()
        .unwrap_err();
        assert!(errors.contains("imageBase64"));
        assert!(errors.contains("fileName"));
        assert!(errors.contains("fileType"));

        let request = AnalyzeInput {
            image_base64: Some("data:image/jpeg;base64,AAAA".into()),
            file_name: Some("script.jpg".into()),
            file_type: None,
        }
        .validate()
        .unwrap();
        assert_eq!(request.file_type, ImageType::Jpeg);
    }

    #[test]
    fn data_url_checks_run_in_order() {
        let not_data_url = decode_data_url("iVBORw0KGgo=", ImageType::Png).unwrap_err();
        assert!(matches!(not_data_url, ApiError::UnsupportedMediaType(_)));

        let gif = decode_data_url("data:image/gif;base64,R0lGOD", ImageType::Png).unwrap_err();
        assert!(matches!(gif, ApiError::UnsupportedMediaType(_)));

        let mismatch = decode_data_url(&format!("data:image/png;base64,{PIXEL}"), ImageType::Jpeg).unwrap_err();
        assert!(matches!(mismatch, ApiError::BadRequest(_)));

        let garbage = decode_data_url("data:image/png;base64,!!!", ImageType::Png).unwrap_err();
        assert!(matches!(garbage, ApiError::BadRequest(_)));

        let image = decode_data_url(&format!("DATA:IMAGE/PNG;BASE64,{PIXEL}"), ImageType::Png).unwrap();
        assert_eq!(image.mime, ImageType::Png);
        assert_eq!(&image.bytes[1..4], b"PNG");
    }

    #[test]
    fn oversized_images_are_rejected() {
        let payload = STANDARD.encode(vec![0u8; MAX_IMAGE_BYTES + 1]);
        let err = decode_data_url(&format!("data:image/jpeg;base64,{payload}"), ImageType::Jpeg).unwrap_err();
        assert!(matches!(err, ApiError::PayloadTooLarge(_)));
    }

    #[test]
    fn session_ids_and_paths_have_expected_shape() {
        let id = session_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts[0], "scan");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2].chars().all(|ch| ch.is_ascii_digit() || ch.is_ascii_lowercase()));

        assert_eq!(sanitize_file_name("my script (1).jpg"), "my_script__1_.jpg");
        let user = Uuid::new_v4();
        assert!(upload_path(user, "a b.png").starts_with(&format!("{user}/prescriptions/")));
        assert!(upload_path(user, "a b.png").ends_with("_a_b.png"));
    }
}
