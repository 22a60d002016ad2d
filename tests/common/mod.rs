#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use medportal::app::Portal;
use medportal::auth::{Claims, ForwardedCredentials, SessionVerifier};
use medportal::config::AuthConfig;
use medportal::services::allocation::AllocationError;
use medportal::services::images::StorageError;
use medportal::services::vision::{PrescriptionExtraction, TokenUsage, VisionAnalysis, VisionError};
use medportal::services::{AllocationNotifier, ImageStore, ScanService, VisionAnalyzer};
use medportal::store::MemoryStores;

pub const SECRET: &str = "test-secret";
pub const AUDIENCE: &str = "authenticated";
pub const ORIGIN: &str = "https://portal.test";

/// A 1x1 PNG.
pub const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

pub struct StubVision {
    pub extraction: Option<PrescriptionExtraction>,
}

#[async_trait]
impl VisionAnalyzer for StubVision {
    async fn analyze(&self, _image: &str) -> Result<VisionAnalysis, VisionError> {
        let extraction = self.extraction.clone().ok_or(VisionError::MissingApiKey)?;
        Ok(VisionAnalysis {
            extraction,
            usage: TokenUsage {
                prompt_tokens: 1000,
                completion_tokens: 200,
            },
        })
    }
}

#[derive(Default)]
pub struct StubImages {
    pub uploads: Mutex<Vec<(String, usize, String)>>,
}

#[async_trait]
impl ImageStore for StubImages {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.uploads
            .lock()
            .unwrap()
            .push((path.to_owned(), bytes.len(), content_type.to_owned()));
        Ok(path.to_owned())
    }
}

/// Records every call and always fails, like an unreachable allocation endpoint.
#[derive(Default)]
pub struct FailingNotifier {
    pub calls: Mutex<Vec<(Uuid, Option<String>)>>,
}

#[async_trait]
impl AllocationNotifier for FailingNotifier {
    async fn notify(
        &self,
        prescription_id: Uuid,
        credentials: &ForwardedCredentials,
    ) -> Result<(), AllocationError> {
        self.calls
            .lock()
            .unwrap()
            .push((prescription_id, credentials.authorization.clone()));
        Err(AllocationError::Status {
            status: 503,
            body: "unavailable".to_owned(),
        })
    }
}

pub fn prescription_extraction() -> PrescriptionExtraction {
    serde_json::from_value(serde_json::json!({
        "isPrescription": true,
        "patientName": "Thandi",
        "doctorName": "Naidoo",
        "medications": [
            { "name": "Amoxicillin", "dosage": "500mg", "frequency": "3x daily", "duration": "7 days" }
        ],
        "overallConfidence": 92.5,
        "scanQuality": 88.0
    }))
    .unwrap()
}

pub struct Harness {
    pub memory: MemoryStores,
    pub images: Arc<StubImages>,
    pub notifier: Arc<FailingNotifier>,
    pub portal: Portal,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_vision(Some(prescription_extraction()))
    }

    pub fn with_vision(extraction: Option<PrescriptionExtraction>) -> Self {
        let memory = MemoryStores::default();
        let stores = memory.clone().into_stores();
        let images = Arc::new(StubImages::default());
        let notifier = Arc::new(FailingNotifier::default());
        let scanner = ScanService::new(
            Arc::new(StubVision { extraction }),
            images.clone(),
            stores.prescriptions.clone(),
        );
        let portal = Portal {
            sessions: Arc::new(SessionVerifier::new(&AuthConfig {
                jwt_secret: SECRET.to_owned(),
                audience: AUDIENCE.to_owned(),
                cookie_name: "sb-access-token".to_owned(),
            })),
            scanner: Arc::new(scanner),
            allocator: notifier.clone(),
            stores,
        };
        Harness {
            memory,
            images,
            notifier,
            portal,
        }
    }
}

pub fn token_for(user: Uuid) -> String {
    let claims = Claims {
        sub: user.to_string(),
        email: Some(format!("{user}@patients.test")),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        aud: AUDIENCE.to_owned(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

pub fn bearer(user: Uuid) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token_for(user)))
}

/// Builds the router around a harness, wrapped in the CSRF guard.
macro_rules! portal_app {
    ($harness:expr) => {{
        let portal = $harness.portal.clone();
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(medportal::security::CsrfGuard::new(vec![common::ORIGIN.to_owned()]))
                .configure(move |cfg| portal.configure(cfg)),
        )
        .await
    }};
}
