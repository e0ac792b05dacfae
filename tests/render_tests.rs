/// Renderer behavior across provider shapes: equivalent data produces the
/// same report regardless of which webhook shape delivered it.
use call_notify_api::call_models::CallWebhookPayload;
use call_notify_api::report::render;

fn render_json(json: &str) -> call_notify_api::report::Report {
    let payload: CallWebhookPayload = serde_json::from_str(json).unwrap();
    render(&payload.into_record().unwrap())
}

#[test]
fn identical_payloads_render_byte_identical_reports() {
    let json = r#"
    {
        "id": "c1",
        "status": "completed",
        "from": "5551234567",
        "duration": 125000,
        "cost": {"combinedCost": 12.5},
        "transcript": "hello"
    }
    "#;
    let first = render_json(json);
    let second = render_json(json);
    assert_eq!(first.text, second.text);
    assert_eq!(first.html, second.html);
}

#[test]
fn flat_and_provider_shapes_render_equivalent_core_fields() {
    let flat = render_json(
        r#"{"id": "x1", "status": "ended", "from": "+15551234567", "to": "+15550001111", "duration": 65000}"#,
    );
    let enveloped = render_json(
        r#"
        {
            "event": "call_ended",
            "call": {
                "call_id": "x1",
                "call_status": "ended",
                "from_number": "+15551234567",
                "to_number": "+15550001111",
                "duration_ms": 65000
            }
        }
        "#,
    );

    assert_eq!(flat.text, enveloped.text);
    assert_eq!(flat.html, enveloped.html);
}

#[test]
fn absent_sections_leave_no_headers() {
    let report = render_json(r#"{"id": "bare", "status": "completed"}"#);
    for heading in ["Analysis", "Cost", "Logs", "Metadata", "Transcript", "Recording"] {
        assert!(
            !report.text.contains(heading),
            "unexpected '{}' section in:\n{}",
            heading,
            report.text
        );
    }
}

#[test]
fn seconds_and_milliseconds_durations_render_identically() {
    let from_ms = render_json(r#"{"id": "d1", "status": "ended", "duration": 125000}"#);
    let from_seconds = render_json(
        r#"{"call_metadata": {"call_id": "d1", "call_status": "ended", "call_duration": 125}}"#,
    );

    assert!(from_ms.text.contains("Duration: 2m 5s"));
    assert!(from_seconds.text.contains("Duration: 2m 5s"));
}
