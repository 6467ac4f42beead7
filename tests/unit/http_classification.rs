//! Unit tests for mapping transport responses onto the error taxonomy

use myshows_backup::fetcher::http::classify_status;
use myshows_backup::fetcher::rpc::classify_rpc_code;
use myshows_backup::fetcher::ErrorKind;
use reqwest::StatusCode;

#[test]
fn test_status_classification() {
    assert_eq!(classify_status(StatusCode::OK), None);
    assert_eq!(classify_status(StatusCode::NO_CONTENT), None);
    assert_eq!(
        classify_status(StatusCode::TOO_MANY_REQUESTS),
        Some(ErrorKind::RateLimited)
    );
    assert_eq!(classify_status(StatusCode::UNAUTHORIZED), Some(ErrorKind::AuthFailed));
    assert_eq!(classify_status(StatusCode::FORBIDDEN), Some(ErrorKind::AuthFailed));
    assert_eq!(classify_status(StatusCode::NOT_FOUND), Some(ErrorKind::BadRequest));
    assert_eq!(
        classify_status(StatusCode::BAD_GATEWAY),
        Some(ErrorKind::ServerError)
    );
}

#[test]
fn test_retryable_kinds_match_taxonomy() {
    for status in [StatusCode::TOO_MANY_REQUESTS, StatusCode::SERVICE_UNAVAILABLE] {
        assert!(classify_status(status).unwrap().is_retryable());
    }
    for status in [StatusCode::UNAUTHORIZED, StatusCode::BAD_REQUEST] {
        assert!(!classify_status(status).unwrap().is_retryable());
    }
    assert!(!classify_rpc_code(-32602).is_retryable());
    assert!(classify_rpc_code(-32603).is_retryable());
}
