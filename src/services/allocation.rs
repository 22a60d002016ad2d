//! Fire-and-forget notification that a submitted prescription needs allocating.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::auth::ForwardedCredentials;

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("allocation request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("allocation endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[async_trait]
pub trait AllocationNotifier: Send + Sync {
    async fn notify(
        &self,
        prescription_id: Uuid,
        credentials: &ForwardedCredentials,
    ) -> Result<(), AllocationError>;
}

/// Calls the portal's own allocate endpoint on behalf of the patient.
pub struct HttpAllocationNotifier {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAllocationNotifier {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        HttpAllocationNotifier {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    pub fn endpoint(&self, prescription_id: Uuid) -> String {
        format!("{}/api/patient/prescriptions/{prescription_id}/allocate", self.base_url)
    }
}

#[async_trait]
impl AllocationNotifier for HttpAllocationNotifier {
    async fn notify(
        &self,
        prescription_id: Uuid,
        credentials: &ForwardedCredentials,
    ) -> Result<(), AllocationError> {
        let mut request = self
            .client
            .post(self.endpoint(prescription_id))
            .header(reqwest::header::ORIGIN, &self.base_url);
        if let Some(cookie) = &credentials.cookie {
            request = request.header(reqwest::header::COOKIE, cookie);
        }
        if let Some(authorization) = &credentials.authorization {
            request = request.header(reqwest::header::AUTHORIZATION, authorization);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AllocationError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Runs the notification on its own task. The outcome is only logged; the
/// caller's response never depends on it.
pub fn dispatch_allocation(
    notifier: Arc<dyn AllocationNotifier>,
    prescription_id: Uuid,
    credentials: ForwardedCredentials,
) -> JoinHandle<()> {
    actix_web::rt::spawn(async move {
        match notifier.notify(prescription_id, &credentials).await {
            Ok(()) => tracing::info!(%prescription_id, "allocation requested"),
            Err(err) => tracing::warn!(%prescription_id, error = %err, "allocation request failed"),
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};

    use super::*;

    #[derive(Debug, Default)]
    struct Received {
        path: String,
        cookie: Option<String>,
        authorization: Option<String>,
        origin: Option<String>,
    }

    type Inbox = Mutex<Vec<Received>>;

    fn header(req: &HttpRequest, name: &str) -> Option<String> {
        req.headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    }

    async fn unavailable(req: HttpRequest, inbox: web::Data<Inbox>) -> HttpResponse {
        inbox.lock().unwrap().push(Received {
            path: req.path().to_owned(),
            cookie: header(&req, "cookie"),
            authorization: header(&req, "authorization"),
            origin: header(&req, "origin"),
        });
        HttpResponse::ServiceUnavailable().body("pharmacies offline")
    }

    struct Failing {
        calls: Mutex<Vec<Uuid>>,
    }

    #[async_trait]
    impl AllocationNotifier for Failing {
        async fn notify(
            &self,
            prescription_id: Uuid,
            _: &ForwardedCredentials,
        ) -> Result<(), AllocationError> {
            self.calls.lock().unwrap().push(prescription_id);
            Err(AllocationError::Status {
                status: 502,
                body: "bad gateway".into(),
            })
        }
    }

    #[test]
    fn endpoint_uses_base_url() {
        let notifier =
            HttpAllocationNotifier::new(reqwest::Client::new(), "https://portal.example.org/".into());
        assert_eq!(
            notifier.endpoint(Uuid::nil()),
            "https://portal.example.org/api/patient/prescriptions/\
             00000000-0000-0000-0000-000000000000/allocate"
        );
    }

    #[actix_web::test]
    async fn notify_forwards_the_session_and_reports_failures() {
        let inbox = web::Data::new(Inbox::default());
        let data = inbox.clone();
        let server = HttpServer::new(move || {
            App::new().app_data(data.clone()).route(
                "/api/patient/prescriptions/{id}/allocate",
                web::post().to(unavailable),
            )
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        let base_url = format!("http://{addr}");
        let notifier = HttpAllocationNotifier::new(reqwest::Client::new(), format!("{base_url}/"));
        let id = Uuid::new_v4();
        let credentials = ForwardedCredentials {
            cookie: Some("sb-access-token=abc.def.ghi".into()),
            authorization: Some("Bearer abc.def.ghi".into()),
        };
        let outcome = notifier.notify(id, &credentials).await;
        handle.stop(true).await;

        match outcome {
            Err(AllocationError::Status { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "pharmacies offline");
            }
            other => panic!("expected a status error, got {other:?}"),
        }
        let received = inbox.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].path, format!("/api/patient/prescriptions/{id}/allocate"));
        assert_eq!(received[0].cookie.as_deref(), Some("sb-access-token=abc.def.ghi"));
        assert_eq!(received[0].authorization.as_deref(), Some("Bearer abc.def.ghi"));
        assert_eq!(received[0].origin.as_deref(), Some(base_url.as_str()));
    }

    #[actix_web::test]
    async fn failures_stay_inside_the_task() {
        let notifier = Arc::new(Failing {
            calls: Mutex::new(Vec::new()),
        });
        let id = Uuid::new_v4();
        let handle = dispatch_allocation(notifier.clone(), id, ForwardedCredentials::default());
        assert!(handle.await.is_ok());
        assert_eq!(*notifier.calls.lock().unwrap(), vec![id]);
    }
}
