//! Route table and shared application state.

use std::sync::Arc;

use actix_web::web;

use crate::auth::SessionVerifier;
use crate::error::{json_error, query_error};
use crate::handlers::{self, communications, medical_aid, prescriptions, profile};
use crate::services::{AllocationNotifier, ScanService};
use crate::store::Stores;

/// Request bodies carry base64 images, so the JSON limit sits above the decoded image cap.
pub const JSON_LIMIT: usize = 16 * 1024 * 1024;

/// Everything the handlers need, cloned into each worker.
#[derive(Clone)]
pub struct Portal {
    pub stores: Stores,
    pub sessions: Arc<SessionVerifier>,
    pub scanner: Arc<ScanService>,
    pub allocator: Arc<dyn AllocationNotifier>,
}

impl Portal {
    /// Registers state and routes; used by the server and by the API tests.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        let stores = &self.stores;
        cfg.app_data(web::JsonConfig::default().limit(JSON_LIMIT).error_handler(json_error))
            .app_data(web::QueryConfig::default().error_handler(query_error))
            .app_data(web::Data::from(self.sessions.clone()))
            .app_data(web::Data::from(self.scanner.clone()))
            .app_data(web::Data::from(self.allocator.clone()))
            .app_data(web::Data::from(stores.prescriptions.clone()))
            .app_data(web::Data::from(stores.communications.clone()))
            .app_data(web::Data::from(stores.profiles.clone()))
            .app_data(web::Data::from(stores.medical_aid.clone()))
            .app_data(web::Data::from(stores.pharmacies.clone()));

        cfg.service(
            web::scope("/api/patient/medical-history")
                .service(handlers::records("/allergies", stores.allergies.clone()))
                .service(handlers::records("/conditions", stores.conditions.clone()))
                .service(handlers::records("/surgeries", stores.surgeries.clone()))
                .service(handlers::records("/immunizations", stores.immunizations.clone()))
                .service(handlers::records("/family-history", stores.family_history.clone())),
        )
        .service(
            web::scope("/api/patient/care-network")
                .service(handlers::records("/caregivers", stores.caregivers.clone())),
        )
        .service(
            web::scope("/api/patient/personal-info")
                .route("/profile", web::get().to(profile::show))
                .route("/profile", web::put().to(profile::upsert))
                .route("/address", web::get().to(profile::addresses))
                .route("/address", web::put().to(profile::upsert_address))
                .route("/medical-aid", web::get().to(medical_aid::show))
                .route("/medical-aid", web::put().to(medical_aid::upsert))
                .service(handlers::records("/emergency-contacts", stores.emergency_contacts.clone()))
                .service(handlers::records("/dependents", stores.dependents.clone())),
        )
        .service(
            web::scope("/api/patient/vitality")
                .service(handlers::records("/vital-signs", stores.vital_signs.clone()))
                .service(handlers::records("/sleep", stores.sleep.clone())),
        )
        .service(
            web::scope("/api/patient/medications")
                .service(handlers::records("/active", stores.active_medications.clone()))
                .service(handlers::records("/history", stores.medication_history.clone()))
                .service(handlers::records("/adherence", stores.medication_adherence.clone())),
        )
        .service(
            web::scope("/api/patient/prescriptions")
                .route("/analyze", web::post().to(prescriptions::analyze))
                .route("", web::get().to(prescriptions::list))
                .route("", web::post().to(prescriptions::save))
                .route("/{id}", web::get().to(prescriptions::show))
                .route("/{id}/submit", web::post().to(prescriptions::submit))
                .route("/{id}/allocate", web::post().to(prescriptions::allocate)),
        )
        .service(
            web::scope("/api/comm")
                .route("/inbox", web::get().to(communications::inbox))
                .route("/send", web::post().to(communications::send))
                .route("/read/{comm_id}", web::post().to(communications::mark_read))
                .route("/unread-count", web::get().to(communications::unread_count))
                .route("/with/{user_id}", web::get().to(communications::thread))
                .route("/recipients", web::get().to(communications::recipients)),
        );
    }
}
