use super::*;
use serde_json::json;

fn body(value: &Value) -> String {
    value.to_string()
}

// =============================================================================
// classify: granted
// =============================================================================

#[test]
fn success_is_granted_with_token_and_profile() {
    let raw = body(&json!({
        "status": "success",
        "message": "Login berhasil",
        "token": "jwt-abc",
        "data": { "nim": "2201001", "nama": "Ayu", "risk_level": "low", "skor_anomali": 0.12 }
    }));

    let LoginOutcome::Granted { token, profile } = classify(200, &raw) else {
        panic!("expected Granted");
    };
    assert_eq!(token, "jwt-abc");
    assert_eq!(profile.get_str("nim"), Some("2201001"));
    assert_eq!(profile.display_name(), Some("Ayu"));
    assert_eq!(profile.risk_level(), Some("low"));
    assert_eq!(profile.anomaly_score(), Some(0.12));
}

#[test]
fn success_with_warning_carries_advisory() {
    let raw = body(&json!({
        "status": "success_with_warning",
        "message": "Login from a new device",
        "token": "jwt-warn",
        "data": { "nim": "2201001" }
    }));

    match classify(200, &raw) {
        LoginOutcome::GrantedWithWarning { token, profile, advisory_message } => {
            assert_eq!(token, "jwt-warn");
            assert_eq!(profile.get_str("nim"), Some("2201001"));
            assert_eq!(advisory_message, "Login from a new device");
        }
        other => panic!("expected GrantedWithWarning, got {other:?}"),
    }
}

#[test]
fn warning_without_message_uses_default_advisory() {
    let raw = body(&json!({ "status": "success_with_warning", "token": "t" }));
    let outcome = classify(200, &raw);
    assert_eq!(outcome.message(), Some(GENERIC_WARNING));
}

#[test]
fn empty_object_with_200_is_rejected() {
    assert_eq!(classify(200, "{}"), LoginOutcome::Rejected { reason: UNEXPECTED_RESPONSE.to_owned() });
}

#[test]
fn success_without_token_is_rejected() {
    let raw = body(&json!({ "status": "success", "data": {} }));
    assert!(matches!(classify(200, &raw), LoginOutcome::Rejected { .. }));
}

#[test]
fn unknown_success_status_is_rejected() {
    let raw = body(&json!({ "status": "maybe", "token": "t" }));
    assert!(matches!(classify(200, &raw), LoginOutcome::Rejected { .. }));
}

#[test]
fn non_json_body_is_rejected_not_panicking() {
    for raw in ["", "<html>502</html>", "[1,2]", "null"] {
        assert!(matches!(classify(200, raw), LoginOutcome::Rejected { .. }), "body {raw:?}");
    }
}

#[test]
fn missing_data_yields_empty_profile() {
    let raw = body(&json!({ "status": "success", "token": "t" }));
    let LoginOutcome::Granted { profile, .. } = classify(200, &raw) else {
        panic!("expected Granted");
    };
    assert!(profile.is_empty());
}

// =============================================================================
// classify: delayed
// =============================================================================

#[test]
fn delayed_with_id_and_seconds() {
    let raw = body(&json!({
        "status": "delayed",
        "message": "Please wait",
        "data": { "id_delayed": 17, "delay_seconds": 120, "risk_level": "high" }
    }));
    assert_eq!(
        classify(429, &raw),
        LoginOutcome::Delayed {
            delay_token: Some("17".into()),
            remaining_seconds: 120,
            advisory_message: Some("Please wait".into()),
        }
    );
}

#[test]
fn delayed_keeps_server_risk_explanation() {
    let raw = body(&json!({
        "status": "delayed",
        "message": "Aktivitas mencurigakan terdeteksi (risk: high). Silakan tunggu.",
        "data": { "id_delayed": 7, "delay_seconds": 5 }
    }));
    let outcome = classify(429, &raw);
    assert_eq!(outcome.message(), Some("Aktivitas mencurigakan terdeteksi (risk: high). Silakan tunggu."));
    assert_eq!(outcome.token(), None);

    let silent = classify(429, &body(&json!({ "data": { "id_delayed": 7, "delay_seconds": 5 } })));
    assert_eq!(silent.message(), None);
}

#[test]
fn delayed_accepts_string_id() {
    let raw = body(&json!({ "data": { "id_delayed": "D1", "delay_seconds": 5 } }));
    assert_eq!(
        classify(429, &raw),
        LoginOutcome::Delayed { delay_token: Some("D1".into()), remaining_seconds: 5, advisory_message: None }
    );
}

#[test]
fn delayed_without_seconds_defaults_to_sixty() {
    let cases = [
        json!({ "status": "delayed", "message": "Too many attempts" }),
        json!({ "data": { "delay_seconds": 0 } }),
        json!({ "data": { "delay_seconds": -3 } }),
        json!({ "data": { "delay_seconds": "30" } }),
        json!({ "data": { "delay_seconds": null } }),
        json!({ "data": "oops" }),
    ];
    for case in cases {
        match classify(429, &body(&case)) {
            LoginOutcome::Delayed { remaining_seconds, .. } => {
                assert_eq!(remaining_seconds, DEFAULT_DELAY_SECS, "case {case}");
            }
            other => panic!("expected Delayed for {case}, got {other:?}"),
        }
    }
}

#[test]
fn delayed_with_malformed_body_still_delays() {
    assert_eq!(
        classify(429, "not json"),
        LoginOutcome::Delayed { delay_token: None, remaining_seconds: 60, advisory_message: None }
    );
}

#[test]
fn brute_force_delay_has_no_token() {
    let raw = body(&json!({ "status": "delayed", "message": "Wait a minute" }));
    assert!(matches!(classify(429, &raw), LoginOutcome::Delayed { delay_token: None, .. }));
}

#[test]
fn blank_delay_id_is_ignored() {
    let raw = body(&json!({ "data": { "id_delayed": "  ", "delay_seconds": 9 } }));
    assert_eq!(
        classify(429, &raw),
        LoginOutcome::Delayed { delay_token: None, remaining_seconds: 9, advisory_message: None }
    );
}

// =============================================================================
// classify: blocked / rejected
// =============================================================================

#[test]
fn forbidden_blocked_is_blocked_with_reason() {
    let raw = body(&json!({ "status": "blocked", "message": "Account blocked by admin" }));
    assert_eq!(classify(403, &raw), LoginOutcome::Blocked { reason: "Account blocked by admin".into() });
}

#[test]
fn forbidden_blocked_without_message_uses_default() {
    let raw = body(&json!({ "status": "blocked" }));
    assert_eq!(classify(403, &raw), LoginOutcome::Blocked { reason: GENERIC_BLOCK.into() });
}

#[test]
fn forbidden_other_is_rejected() {
    let raw = body(&json!({ "status": "error", "message": "Not allowed" }));
    assert_eq!(classify(403, &raw), LoginOutcome::Rejected { reason: "Not allowed".into() });
}

#[test]
fn unauthorized_is_rejected_with_server_message() {
    let raw = body(&json!({ "status": "error", "message": "NIM atau password salah" }));
    assert_eq!(classify(401, &raw), LoginOutcome::Rejected { reason: "NIM atau password salah".into() });
}

#[test]
fn unauthorized_without_message_is_generic() {
    assert_eq!(classify(401, "{}"), LoginOutcome::Rejected { reason: GENERIC_REJECTION.into() });
}

#[test]
fn other_status_is_generic_rejection() {
    let raw = body(&json!({ "status": "error", "message": "Terjadi kesalahan pada server" }));
    let outcome = classify(500, &raw);
    let LoginOutcome::Rejected { reason } = outcome else {
        panic!("expected Rejected");
    };
    assert!(reason.contains("500"));
}

#[test]
fn only_granted_outcomes_expose_token() {
    let granted = classify(200, &body(&json!({ "status": "success", "token": "t" })));
    assert_eq!(granted.token(), Some("t"));
    assert!(granted.is_granted());
    for status in [401, 403, 429, 500] {
        assert_eq!(classify(status, "{}").token(), None, "status {status}");
    }
}

// =============================================================================
// classify_poll
// =============================================================================

#[test]
fn poll_completed_with_token() {
    let raw = body(&json!({
        "status": "completed",
        "token": "jwt-late",
        "data": { "nim": "2201001", "nama": "Ayu" }
    }));
    match classify_poll(200, &raw) {
        PollReply::Completed { token, profile } => {
            assert_eq!(token, "jwt-late");
            assert_eq!(profile.display_name(), Some("Ayu"));
        }
        other => panic!("expected Completed, got {other:?}"),
    }
}

#[test]
fn poll_completed_without_token_is_other() {
    let raw = body(&json!({ "status": "completed", "message": "done" }));
    assert_eq!(classify_poll(200, &raw), PollReply::Other { message: "done".into() });
}

#[test]
fn poll_waiting_reports_remaining() {
    let raw = body(&json!({ "status": "waiting", "data": { "remaining_seconds": 10 } }));
    assert_eq!(classify_poll(202, &raw), PollReply::Waiting { remaining_seconds: 10 });
}

#[test]
fn poll_waiting_without_remaining_is_other() {
    let raw = body(&json!({ "status": "waiting", "data": {} }));
    assert!(matches!(classify_poll(202, &raw), PollReply::Other { .. }));
}

#[test]
fn poll_error_uses_server_message() {
    let raw = body(&json!({ "status": "error", "message": "Delayed login sudah cancelled" }));
    assert_eq!(classify_poll(403, &raw), PollReply::Other { message: "Delayed login sudah cancelled".into() });
}

#[test]
fn poll_garbage_is_other() {
    assert_eq!(classify_poll(500, "oops"), PollReply::Other { message: UNEXPECTED_RESPONSE.into() });
}

// =============================================================================
// helpers
// =============================================================================

#[test]
fn server_message_and_profile_helpers() {
    let raw = body(&json!({ "message": "hi", "data": { "username": "root" } }));
    assert_eq!(server_message(&raw).as_deref(), Some("hi"));
    assert_eq!(profile_from_body(&raw).display_name(), Some("root"));
    assert_eq!(server_message("nope"), None);
    assert!(profile_from_body("nope").is_empty());
}
