use super::*;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use portal::config::ClientTimeouts;

fn jwt(payload: &str) -> String {
    format!("{}.{}.sig", URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256"}"#), URL_SAFE_NO_PAD.encode(payload))
}

#[test]
fn token_collection_reads_claim() {
    let token = jwt(r#"{"id":"u1","collectionId":"_pb_users_auth_"}"#);
    assert_eq!(token_collection(&token).as_deref(), Some("_pb_users_auth_"));
}

#[test]
fn token_collection_missing_or_opaque() {
    assert_eq!(token_collection(&jwt(r#"{"id":"u1"}"#)), None);
    assert_eq!(token_collection(&jwt(r#"{"collectionId":""}"#)), None);
    assert_eq!(token_collection("not-a-jwt"), None);
}

#[test]
fn source_rejects_invalid_base_url() {
    assert!(PocketBaseSource::new("not a url", "users", ClientTimeouts::default()).is_err());
    assert!(PocketBaseSource::new("http://127.0.0.1:8090", "users", ClientTimeouts::default()).is_ok());
}
