use std::time::{SystemTime, UNIX_EPOCH};

use crate::model::codes::{Department, Position};
use crate::models::{Claims, TokenType};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

pub fn generate_access_token(
    user_id: u64,
    account: String,
    department: Department,
    position: Position,
    secret: &str,
    ttl: usize,
) -> String {
    let claims = Claims {
        user_id,
        sub: account,
        department,
        position,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type: TokenType::Access,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

pub fn generate_refresh_token(
    user_id: u64,
    account: String,
    department: Department,
    position: Position,
    secret: &str,
    ttl: usize,
) -> (String, Claims) {
    let claims = Claims {
        user_id,
        sub: account,
        department,
        position,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type: TokenType::Refresh,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap();

    (token, claims)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn access_token_round_trips() {
        let token = generate_access_token(
            7,
            "lin.wei".to_string(),
            Department::LD,
            Position::S,
            SECRET,
            60,
        );

        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.sub, "lin.wei");
        assert_eq!(claims.department, Department::LD);
        assert_eq!(claims.position, Position::S);
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn refresh_token_carries_refresh_type_and_jti() {
        let (token, issued) = generate_refresh_token(
            7,
            "lin.wei".to_string(),
            Department::BD,
            Position::M,
            SECRET,
            60,
        );

        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.token_type, TokenType::Refresh);
        assert_eq!(claims.jti, issued.jti);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_access_token(
            1,
            "x".to_string(),
            Department::FD,
            Position::C,
            SECRET,
            60,
        );
        assert!(verify_token(&token, "other-secret").is_err());
    }
}
