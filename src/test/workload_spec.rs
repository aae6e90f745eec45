use crate::workload::WorkloadSpec;

#[test]
fn workload_spec_parses_minimal_json_with_defaults() {
    let raw = r#"
    {
        "schema_version": 1,
        "sessions": [ { "id": "s1", "start_secs": 0 } ]
    }
    "#;
    let spec: WorkloadSpec = serde_json::from_str(raw).expect("parse workload spec");
    assert_eq!(spec.schema_version, 1);
    assert!(spec.name.is_none());
    assert!(spec.tick_seconds.is_none());
    assert!(spec.timescale.is_none());
    assert_eq!(spec.sessions.len(), 1);

    let session = &spec.sessions[0];
    assert_eq!(session.id, "s1");
    assert_eq!(session.start_secs, 0);
    assert!(session.stop_secs.is_none());
    assert!(session.cpus.is_none());
    assert!(session.trainings.is_empty());
    assert!(session.gpu_util_updates.is_empty());
}

#[test]
fn workload_spec_parses_full_session_definitions() {
    let raw = r#"
    {
        "schema_version": 1,
        "name": "morning-rush",
        "tick_seconds": 60,
        "timescale": 0.5,
        "sessions": [
            {
                "id": "s1",
                "start_secs": 0,
                "stop_secs": 600,
                "cpus": 4.0,
                "memory_mb": 2048.0,
                "gpus": 2,
                "gpu_kind": "A100",
                "trainings": [ { "start_secs": 60, "end_secs": 300 } ],
                "gpu_util_updates": [ { "at_secs": 120, "gpu_util": 95.0 } ]
            }
        ]
    }
    "#;
    let spec: WorkloadSpec = serde_json::from_str(raw).expect("parse workload spec");
    assert_eq!(spec.name.as_deref(), Some("morning-rush"));
    assert_eq!(spec.tick_seconds, Some(60));
    assert_eq!(spec.timescale, Some(0.5));

    let session = &spec.sessions[0];
    assert_eq!(session.stop_secs, Some(600));
    assert_eq!(session.cpus, Some(4.0));
    assert_eq!(session.memory_mb, Some(2048.0));
    assert_eq!(session.gpus, Some(2));
    assert_eq!(session.gpu_kind.as_deref(), Some("A100"));
    assert_eq!(session.trainings.len(), 1);
    assert_eq!(session.trainings[0].start_secs, 60);
    assert_eq!(session.trainings[0].end_secs, 300);
    assert_eq!(session.gpu_util_updates.len(), 1);
    assert_eq!(session.gpu_util_updates[0].gpu_util, 95.0);
}

#[test]
fn workload_spec_round_trips_through_json() {
    let raw = r#"
    {
        "schema_version": 1,
        "name": "round-trip",
        "sessions": [ { "id": "s1", "start_secs": 30 } ]
    }
    "#;
    let spec: WorkloadSpec = serde_json::from_str(raw).expect("parse workload spec");
    let encoded = serde_json::to_string(&spec).expect("encode workload spec");
    let decoded: WorkloadSpec = serde_json::from_str(&encoded).expect("re-parse workload spec");
    assert_eq!(decoded.name.as_deref(), Some("round-trip"));
    assert_eq!(decoded.sessions[0].start_secs, 30);
}
