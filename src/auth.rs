//! Session identity read from the hosted auth provider's access token.

use std::future::{Ready, ready};

use actix_web::dev::Payload;
use actix_web::http::header::{AUTHORIZATION, COOKIE, HeaderName};
use actix_web::{FromRequest, HttpRequest, web};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::ApiError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: usize,
    pub aud: String,
}

/// Raw session headers, forwarded verbatim on the allocation call.
#[derive(Debug, Clone, Default)]
pub struct ForwardedCredentials {
    pub cookie: Option<String>,
    pub authorization: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub credentials: ForwardedCredentials,
}

pub struct SessionVerifier {
    key: DecodingKey,
    validation: Validation,
    cookie_name: String,
}

impl SessionVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);
        SessionVerifier {
            key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            cookie_name: config.cookie_name.clone(),
        }
    }

    /// Bearer token first, then the session cookie.
    fn token(&self, req: &HttpRequest) -> Option<String> {
        let bearer = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_owned())
            .filter(|token| !token.is_empty());
        bearer.or_else(|| req.cookie(&self.cookie_name).map(|cookie| cookie.value().to_owned()))
    }

    pub fn verify(&self, token: &str) -> Result<(Uuid, Option<String>), ApiError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|err| {
            tracing::debug!(error = %err, "rejected session token");
            ApiError::Unauthorized
        })?;
        let id = Uuid::parse_str(&data.claims.sub).map_err(|_| ApiError::Unauthorized)?;
        Ok((id, data.claims.email))
    }

    pub fn authenticate(&self, req: &HttpRequest) -> Result<AuthenticatedUser, ApiError> {
        let token = self.token(req).ok_or(ApiError::Unauthorized)?;
        let (id, email) = self.verify(&token)?;
        let header = |name: HeaderName| {
            req.headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
        };
        Ok(AuthenticatedUser {
            id,
            email,
            credentials: ForwardedCredentials {
                cookie: header(COOKIE),
                authorization: header(AUTHORIZATION),
            },
        })
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = match req.app_data::<web::Data<SessionVerifier>>() {
            Some(verifier) => verifier.authenticate(req),
            None => Err(ApiError::Internal("session verifier not registered".to_owned())),
        };
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use actix_web::cookie::Cookie;
    use actix_web::test::TestRequest;
    use jsonwebtoken::{EncodingKey, Header, encode};

    use super::*;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".into(),
            audience: "authenticated".into(),
            cookie_name: "sb-access-token".into(),
        }
    }

    fn token(sub: &str, aud: &str, secret: &str) -> String {
        let claims = Claims {
            sub: sub.into(),
            email: Some("thandi@example.org".into()),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
            aud: aud.into(),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn bearer_token_identifies_user() {
        let verifier = SessionVerifier::new(&config());
        let id = Uuid::new_v4();
        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, format!("Bearer {}", token(&id.to_string(), "authenticated", "test-secret"))))
            .to_http_request();
        let user = verifier.authenticate(&req).unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email.as_deref(), Some("thandi@example.org"));
        assert!(user.credentials.authorization.is_some());
    }

    #[test]
    fn cookie_token_is_accepted() {
        let verifier = SessionVerifier::new(&config());
        let id = Uuid::new_v4();
        let req = TestRequest::default()
            .cookie(Cookie::new("sb-access-token", token(&id.to_string(), "authenticated", "test-secret")))
            .to_http_request();
        assert_eq!(verifier.authenticate(&req).unwrap().id, id);
    }

    #[test]
    fn bad_tokens_are_unauthorized() {
        let verifier = SessionVerifier::new(&config());
        let id = Uuid::new_v4().to_string();
        for bad in [
            token(&id, "authenticated", "other-secret"),
            token(&id, "anon", "test-secret"),
            token("not-a-uuid", "authenticated", "test-secret"),
        ] {
            assert!(matches!(verifier.verify(&bad), Err(ApiError::Unauthorized)));
        }
        let req = TestRequest::default().to_http_request();
        assert!(matches!(verifier.authenticate(&req), Err(ApiError::Unauthorized)));
    }
}
