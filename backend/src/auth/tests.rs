use super::*;
use axum::http::Request;
use jsonwebtoken::{EncodingKey, Header, encode};

const SECRET: &str = "supersecretjwtsecretforunittesting123";
const USER_ID: &str = "123e4567-e89b-12d3-a456-426614174000";

fn claims(sub: &str, aud: &str, exp: usize) -> SupabaseClaims {
    SupabaseClaims {
        sub: sub.to_string(),
        role: "authenticated".to_string(),
        email: Some("test@example.com".to_string()),
        aud: Some(aud.to_string()),
        exp,
    }
}

fn token(claims: &SupabaseClaims, secret: &str) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

async fn extract(authorization: Option<String>) -> Result<AuthUser, AppError> {
    let mut builder = Request::builder().uri("/");
    if let Some(value) = authorization {
        builder = builder.header(AUTHORIZATION, value);
    }
    let (mut parts, _) = builder.body(()).unwrap().into_parts();
    parts.extensions.insert(AuthConfig::new(SECRET));
    AuthUser::from_request_parts(&mut parts, &()).await
}

#[test]
fn test_validate_supabase_jwt_success() {
    let my_claims = claims(USER_ID, "authenticated", 9999999999);
    let claims = validate_supabase_jwt(&token(&my_claims, SECRET), SECRET)
        .expect("Valid token should pass");
    assert_eq!(claims.sub, my_claims.sub);
    assert_eq!(claims.email, my_claims.email);
}

#[test]
fn test_validate_supabase_jwt_expired() {
    let expired = claims(USER_ID, "authenticated", 1);
    assert!(validate_supabase_jwt(&token(&expired, SECRET), SECRET).is_err());
}

#[test]
fn test_validate_supabase_jwt_invalid_signature() {
    let my_claims = claims(USER_ID, "authenticated", 9999999999);
    assert!(validate_supabase_jwt(&token(&my_claims, "wrongsecret"), SECRET).is_err());
}

#[test]
fn test_validate_supabase_jwt_wrong_audience() {
    let my_claims = claims(USER_ID, "anon-key", 9999999999);
    assert!(validate_supabase_jwt(&token(&my_claims, SECRET), SECRET).is_err());
}

#[tokio::test]
async fn extractor_yields_user_from_bearer_token() {
    let bearer = format!(
        "Bearer {}",
        token(&claims(USER_ID, "authenticated", 9999999999), SECRET)
    );
    let user = extract(Some(bearer)).await.unwrap();
    assert_eq!(user.user_id, Uuid::parse_str(USER_ID).unwrap());
    assert_eq!(user.role, "authenticated");
}

#[tokio::test]
async fn extractor_rejects_missing_or_malformed_credentials() {
    assert!(matches!(extract(None).await, Err(AppError::Unauthorized)));
    assert!(matches!(
        extract(Some("Token abc".to_string())).await,
        Err(AppError::Unauthorized)
    ));

    let non_uuid = token(&claims("not-a-uuid", "authenticated", 9999999999), SECRET);
    assert!(matches!(
        extract(Some(format!("Bearer {non_uuid}"))).await,
        Err(AppError::Unauthorized)
    ));
}
