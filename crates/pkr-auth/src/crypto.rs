use super::claims::Claims;

/// Access tokens live for a full play session.
const ACCESS_TOKEN_DURATION: std::time::Duration =
    std::time::Duration::from_secs(24 * 60 * 60);

/// JWT signing and verification (HMAC-SHA256).
pub struct Crypto {
    encoding: jsonwebtoken::EncodingKey,
    decoding: jsonwebtoken::DecodingKey,
}

impl Crypto {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: jsonwebtoken::EncodingKey::from_secret(secret),
            decoding: jsonwebtoken::DecodingKey::from_secret(secret),
        }
    }
    pub fn encode(&self, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
        jsonwebtoken::encode(&jsonwebtoken::Header::default(), claims, &self.encoding)
    }
    pub fn decode(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &jsonwebtoken::Validation::default())
            .map(|data| data.claims)
    }
    pub const fn duration() -> std::time::Duration {
        ACCESS_TOKEN_DURATION
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkr_core::ID;

    #[test]
    fn roundtrip() {
        let crypto = Crypto::new(b"test-secret");
        let claims = Claims::new(ID::default(), "alice".into(), Crypto::duration());
        let token = crypto.encode(&claims).unwrap();
        let decoded = crypto.decode(&token).unwrap();
        assert_eq!(decoded.player_id, claims.player_id);
        assert_eq!(decoded.username, "alice");
        assert!(!decoded.expired());
    }

    #[test]
    fn wrong_secret_rejected() {
        let crypto = Crypto::new(b"test-secret");
        let claims = Claims::new(ID::default(), "alice".into(), Crypto::duration());
        let token = crypto.encode(&claims).unwrap();
        assert!(Crypto::new(b"other-secret").decode(&token).is_err());
    }

    #[test]
    fn expired_token_rejected() {
        let crypto = Crypto::new(b"test-secret");
        let mut claims = Claims::new(ID::default(), "alice".into(), Crypto::duration());
        claims.iat -= 100_000;
        claims.exp = claims.iat + 1;
        let token = crypto.encode(&claims).unwrap();
        // jsonwebtoken validates exp during decode.
        assert!(crypto.decode(&token).is_err());
    }
}
