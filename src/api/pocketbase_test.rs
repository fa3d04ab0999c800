use super::*;
use crate::filter::Sort;

fn base() -> Url {
    parse_base_url("http://127.0.0.1:8090").unwrap()
}

#[test]
fn collection_url_appends_segments() {
    let url = collection_url(&base(), "users", &["auth-refresh"]).unwrap();
    assert_eq!(url.as_str(), "http://127.0.0.1:8090/api/collections/users/auth-refresh");
}

#[test]
fn collection_url_keeps_base_path_prefix() {
    let base = parse_base_url("https://example.test/pb/").unwrap();
    let url = collection_url(&base, "users", &["records", "u1"]).unwrap();
    assert_eq!(url.as_str(), "https://example.test/pb/api/collections/users/records/u1");
}

#[test]
fn collection_url_encodes_segments() {
    let url = collection_url(&base(), "users", &["records", "a/b c"]).unwrap();
    assert_eq!(url.path(), "/api/collections/users/records/a%2Fb%20c");
}

#[test]
fn path_url_joins_absolute_path() {
    let base = parse_base_url("https://example.test/pb/").unwrap();
    assert_eq!(path_url(&base, "/api/me").unwrap().as_str(), "https://example.test/pb/api/me");
}

#[test]
fn list_url_carries_paging_filter_and_sort() {
    let options = ListOptions::filtered(Filter::any_of("requiredPermission", ["", "report.view"]))
        .sorted(Sort::asc("order"));
    let url = list_url(&base(), "menu_items", 2, 500, &options).unwrap();
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert_eq!(
        pairs,
        vec![
            ("page".to_owned(), "2".to_owned()),
            ("perPage".to_owned(), "500".to_owned()),
            ("skipTotal".to_owned(), "1".to_owned()),
            (
                "filter".to_owned(),
                "requiredPermission = '' || requiredPermission = 'report.view'".to_owned()
            ),
            ("sort".to_owned(), "order".to_owned()),
        ]
    );
}

#[test]
fn invalid_base_url_is_rejected() {
    assert!(matches!(parse_base_url("not a url"), Err(ApiError::Url(_))));
    assert!(matches!(parse_base_url("mailto:a@b.c"), Err(ApiError::Url(_))));
}

#[test]
fn parse_error_body_reads_field_codes() {
    let text = r#"{"status":400,"message":"Failed to create record.","data":{"email":{"code":"validation_not_unique","message":"Value must be unique."}}}"#;
    let err = parse_error_body(400, text);
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.field_code("email"), Some("validation_not_unique"));
    assert!(err.to_string().contains("Failed to create record."));
}

#[test]
fn parse_error_body_falls_back_to_raw_text() {
    let err = parse_error_body(502, "  Bad Gateway\n");
    match err {
        ApiError::Response { status, message, data } => {
            assert_eq!(status, 502);
            assert_eq!(message, "Bad Gateway");
            assert!(data.is_empty());
        }
        other => panic!("expected response error, got {other:?}"),
    }
}

#[test]
fn parse_body_treats_empty_as_null() {
    assert_eq!(parse_body("").unwrap(), Value::Null);
    assert_eq!(parse_body("{\"a\":1}").unwrap(), json!({ "a": 1 }));
    assert!(matches!(parse_body("{"), Err(ApiError::Parse(_))));
}

#[test]
fn parse_list_page_reads_items() {
    let page = parse_list_page(json!({
        "page": 1,
        "perPage": 500,
        "items": [ { "id": "m1" }, { "id": "m2" } ]
    }))
    .unwrap();
    assert_eq!(page.items.len(), 2);
}

#[test]
fn parse_auth_reads_token_and_record() {
    let auth = parse_auth(json!({ "token": "t1", "record": { "id": "u1" } })).unwrap();
    assert_eq!(auth.token, "t1");
    assert_eq!(auth.record["id"], "u1");
    assert!(matches!(parse_auth(json!({ "record": {} })), Err(ApiError::Parse(_))));
}

#[test]
fn client_builds_with_default_timeouts() {
    let client = PocketBaseClient::new("http://127.0.0.1:8090", ClientTimeouts::default(), AuthStore::new()).unwrap();
    assert_eq!(client.base_url().as_str(), "http://127.0.0.1:8090/");
    assert!(!client.auth_store().is_valid());
}
