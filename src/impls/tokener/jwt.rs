use crate::core::ports::tokener::{Payload, Tokener};
use crate::error::Error;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct Claim {
    pub uid: i32,
    pub exp: i64,
}

impl Payload for Claim {
    fn user_id(&self) -> i32 {
        self.uid
    }
}

#[derive(Clone)]
pub struct JWT {
    secret: Vec<u8>,
}

impl JWT {
    pub fn new(secret: Vec<u8>) -> Self {
        Self { secret }
    }
}

impl<P> Tokener<P> for JWT
where
    P: Payload,
{
    fn gen_token(&self, payload: &P) -> Result<String, Error> {
        let header = Header::new(Algorithm::HS256);
        let key = EncodingKey::from_secret(&self.secret);
        let token = encode(&header, payload, &key)?;
        Ok(token)
    }

    fn verify_token(&self, token: &str) -> Result<P, Error> {
        let key = DecodingKey::from_secret(&self.secret);
        let validation = Validation::new(Algorithm::HS256);
        let payload = decode(token, &key, &validation)?;
        Ok(payload.claims)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn claim(uid: i32, ttl: i64) -> Claim {
        Claim {
            uid,
            exp: chrono::Utc::now().timestamp() + ttl,
        }
    }

    #[test]
    fn test_gen_and_verify_token() {
        let jwt = JWT::new(b"survey-test-secret".to_vec());
        let token = jwt.gen_token(&claim(42, 3600)).unwrap();
        let c: Claim = jwt.verify_token(&token).unwrap();
        assert_eq!(c.user_id(), 42);
    }

    #[test]
    fn test_rejects_foreign_and_expired_tokens() {
        let jwt = JWT::new(b"survey-test-secret".to_vec());
        let other = JWT::new(b"another-secret".to_vec());
        let token = other.gen_token(&claim(1, 3600)).unwrap();
        assert!(matches!(<JWT as Tokener<Claim>>::verify_token(&jwt, &token), Err(Error::JWTError(_))));

        let expired = jwt.gen_token(&claim(1, -3600)).unwrap();
        assert!(<JWT as Tokener<Claim>>::verify_token(&jwt, &expired).is_err());
        assert!(<JWT as Tokener<Claim>>::verify_token(&jwt, "not-a-token").is_err());
    }
}
