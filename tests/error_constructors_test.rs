use ekiwi::error::{EkiwiError, RemoteApiError};

#[test]
fn error_constructors_group_1() {
    assert!(matches!(EkiwiError::config("x"), EkiwiError::Config { .. }));
    assert!(matches!(EkiwiError::io("x"), EkiwiError::Io { .. }));
    assert!(matches!(
        EkiwiError::network("x"),
        EkiwiError::Network { .. }
    ));
    assert!(matches!(
        EkiwiError::timeout("x"),
        EkiwiError::Timeout { .. }
    ));
    assert!(matches!(EkiwiError::api("x"), EkiwiError::Api { .. }));
}

#[test]
fn error_constructors_group_2() {
    assert!(matches!(EkiwiError::auth("x"), EkiwiError::Auth { .. }));
    assert!(matches!(EkiwiError::cipher("x"), EkiwiError::Cipher { .. }));
    assert!(matches!(
        EkiwiError::serialization("x"),
        EkiwiError::Serialization { .. }
    ));
    assert!(matches!(
        EkiwiError::validation("f", "m"),
        EkiwiError::Validation { .. }
    ));
    assert!(matches!(
        EkiwiError::not_found("x"),
        EkiwiError::NotFound { .. }
    ));
}

#[test]
fn remote_error_conversion() {
    let err: EkiwiError = RemoteApiError::new(401, "Unauthorized", "expired").into();
    assert!(err.is_login_required());
    assert_eq!(err.remote().map(|r| r.code), Some(401));

    let err: EkiwiError = RemoteApiError::new(500, "Server", "boom").into();
    assert!(!err.is_login_required());
    assert!(EkiwiError::api("x").remote().is_none());
}

#[test]
fn json_error_maps_to_serialization() {
    let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: EkiwiError = parse.into();
    assert!(matches!(err, EkiwiError::Serialization { .. }));
}
