use super::Session;
use super::State;
use crate::Identity;
use actix_web::FromRequest;
use actix_web::HttpRequest;
use actix_web::dev::Payload;
use actix_web::web;
use std::future::Future;
use std::pin::Pin;

/// Extractor for authenticated requests. Resolves the bearer token to a
/// live session through the ledger; expired or unknown tokens are
/// rejected before the handler runs.
pub struct Auth(pub Session);

impl Auth {
    pub fn identity(&self) -> &Identity {
        self.0.account()
    }
    pub fn session(&self) -> &Session {
        &self.0
    }
}

impl FromRequest for Auth {
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;
    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<State>>().cloned();
        let token = bearer(req);
        Box::pin(async move {
            let token = token
                .ok_or_else(|| actix_web::error::ErrorUnauthorized("missing bearer token"))?;
            let state = state
                .ok_or_else(|| actix_web::error::ErrorInternalServerError("state not configured"))?;
            let session = state
                .ledger
                .find_session(&Session::digest(&token))
                .await
                .map_err(|_| actix_web::error::ErrorInternalServerError("session lookup failed"))?
                .ok_or_else(|| actix_web::error::ErrorUnauthorized("session not found"))?;
            if session.expired(std::time::SystemTime::now()) {
                return Err(actix_web::error::ErrorUnauthorized("session expired"));
            }
            Ok(Auth(session))
        })
    }
}

/// Token from the Authorization header, or from a `token` query
/// parameter for WebSocket upgrades, where browsers cannot set headers.
fn bearer(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
        .or_else(|| {
            req.query_string()
                .split('&')
                .find_map(|pair| pair.strip_prefix("token="))
                .map(str::to_string)
        })
}

/// Password hashing with argon2. Hashes carry their own salt and
/// parameters, so verification needs no stored state beyond the string.
pub mod password {
    use argon2::Argon2;
    use argon2::PasswordHash;
    use argon2::PasswordHasher;
    use argon2::PasswordVerifier;
    use argon2::password_hash::SaltString;
    use argon2::password_hash::rand_core::OsRng;

    pub fn hash(password: &str) -> Result<String, argon2::password_hash::Error> {
        Argon2::default()
            .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))
            .map(|h| h.to_string())
    }

    pub fn verify(password: &str, hashword: &str) -> bool {
        PasswordHash::new(hashword)
            .ok()
            .as_ref()
            .map(|hash| {
                Argon2::default()
                    .verify_password(password.as_bytes(), hash)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hashword = password::hash("hunter2hunter2").unwrap();
        assert!(password::verify("hunter2hunter2", &hashword));
        assert!(!password::verify("wrong", &hashword));
    }

    #[test]
    fn garbage_hashword_never_verifies() {
        assert!(!password::verify("anything", "not a phc string"));
    }
}
