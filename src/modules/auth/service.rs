use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

const TOKEN_LIFETIME_DAYS: i64 = 30;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub iat: i64,
    pub exp: i64,
}

pub enum Error {
    InvalidToken,
    UnexpectedError,
}

pub fn sign_token(secret: &str, user_id: String) -> Result<String, Error> {
    let now = Utc::now();
    let claims = Claims {
        id: user_id,
        iat: now.timestamp(),
        exp: (now + Duration::days(TOKEN_LIFETIME_DAYS)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|err| {
        tracing::error!("Failed to sign access token: {}", err);
        Error::UnexpectedError
    })
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|_| Error::InvalidToken)
}

pub fn hash_password(password: &str) -> Result<String, Error> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|err| {
        tracing::error!("Failed to hash password: {}", err);
        Error::UnexpectedError
    })
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, Error> {
    bcrypt::verify(password, hash).map_err(|err| {
        tracing::error!("Failed to verify password: {}", err);
        Error::UnexpectedError
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_preserves_the_identity_claim() {
        let token = sign_token("test-secret", "01J0WYN4V5D2CQ6M4RT0".to_string())
            .ok()
            .unwrap();
        let claims = verify_token("test-secret", &token).ok().unwrap();

        assert_eq!(claims.id, "01J0WYN4V5D2CQ6M4RT0");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let token = sign_token("test-secret", "01J0WYN4V5D2CQ6M4RT0".to_string())
            .ok()
            .unwrap();

        assert!(verify_token("another-secret", &token).is_err());
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let token = sign_token("test-secret", "01J0WYN4V5D2CQ6M4RT0".to_string())
            .ok()
            .unwrap();
        let mut tampered = token.clone();
        tampered.replace_range(0..1, "x");

        assert!(verify_token("test-secret", &tampered).is_err());
    }

    #[test]
    fn hashed_passwords_verify_only_against_the_right_password() {
        let hash = hash_password("hunter22").ok().unwrap();

        assert!(verify_password("hunter22", &hash).ok().unwrap());
        assert!(!verify_password("hunter23", &hash).ok().unwrap());
    }
}
