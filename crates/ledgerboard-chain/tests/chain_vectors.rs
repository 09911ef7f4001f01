//! Integration tests: tamper vectors.
//!
//! Each fixture in tests/fixtures/ has:
//! - case.json: records to append and an optional tamper step
//! - expect.json: the expected validation result and per-subject history,
//!   or `rejected`: text of the error the tampered records fail to decode with
//!
//! Tampering goes through the JSON form of the records, the same surface a
//! persisted chain is edited through.

use chrono::{Duration, TimeZone, Utc};
use ledgerboard_chain::{Chain, HashRecord, ManualClock};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn read_json(path: PathBuf) -> Value {
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    serde_json::from_str(&text).unwrap_or_else(|e| panic!("failed to parse {}: {e}", path.display()))
}

fn build_chain(case: &Value, clock: &ManualClock) -> Chain {
    let mut chain = Chain::with_clock(Arc::new(clock.clone()));
    for append in case["appends"].as_array().expect("missing appends") {
        clock.advance(Duration::seconds(1));
        chain.append(
            append["action"].as_str().expect("action"),
            append["subject_kind"].as_str().expect("subject_kind"),
            append["subject_id"].as_str().expect("subject_id"),
            append["payload"].clone(),
            append["author_id"].as_str().expect("author_id"),
        );
    }
    chain
}

fn tamper(records: Vec<HashRecord>, step: &Value) -> Result<Vec<HashRecord>, String> {
    if step.is_null() {
        return Ok(records);
    }
    let target = step["record"].as_u64().expect("tamper record") as usize;
    let mut values: Vec<Value> = records
        .iter()
        .map(|r| serde_json::to_value(r).expect("record should serialize"))
        .collect();

    match step["kind"].as_str().expect("tamper kind") {
        "edit" => {
            let field = step["field"].as_str().expect("tamper field");
            values[target][field] = step["value"].clone();
        }
        "drop" => {
            values.remove(target);
        }
        other => panic!("unknown tamper kind: {other}"),
    }

    values
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(|e| e.to_string()))
        .collect()
}

fn run_fixture(name: &str) {
    let dir = fixtures_dir().join(name);
    let case = read_json(dir.join("case.json"));
    let expected = read_json(dir.join("expect.json"));

    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap());
    let built = build_chain(&case, &clock);
    assert!(built.validate().valid, "fixture {name}: untampered chain must be valid");

    let records = match tamper(built.records().to_vec(), &case["tamper"]) {
        Ok(records) => records,
        Err(message) => {
            let want = expected["rejected"]
                .as_str()
                .unwrap_or_else(|| panic!("fixture {name}: unexpected decode error: {message}"));
            assert!(message.contains(want), "fixture {name}: got {message}");
            return;
        }
    };
    assert!(
        expected["rejected"].is_null(),
        "fixture {name}: tampered records decoded"
    );
    let chain = Chain::from_records(records, Arc::new(clock)).expect("chain should rebuild");

    let validation = serde_json::to_value(chain.validate()).expect("validation serializes");
    assert_eq!(
        validation, expected["validation"],
        "\n\nFixture: {name}\n\nGot:\n{validation}\n"
    );

    for (subject, sequence) in expected["history"].as_object().expect("missing history") {
        let got: Vec<u64> = chain
            .history(subject)
            .iter()
            .map(|r| r.sequence_number())
            .collect();
        let want: Vec<u64> = sequence
            .as_array()
            .expect("history must be an array")
            .iter()
            .map(|n| n.as_u64().expect("sequence number"))
            .collect();
        assert_eq!(got, want, "fixture {name}: history of {subject}");
    }
}

#[test]
fn scenario_a_history() {
    run_fixture("scenario_a_history");
}

#[test]
fn scenario_c_tampered_action() {
    run_fixture("scenario_c_tampered_action");
}

#[test]
fn tampered_last_payload() {
    run_fixture("tampered_last_payload");
}

#[test]
fn dropped_record() {
    run_fixture("dropped_record");
}

#[test]
fn tampered_genesis() {
    run_fixture("tampered_genesis");
}

#[test]
fn sub_microsecond_timestamp() {
    run_fixture("sub_microsecond_timestamp");
}

#[test]
fn tamper_at_every_position_is_located() {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap());
    let mut chain = Chain::with_clock(Arc::new(clock.clone()));
    for i in 0..8 {
        clock.advance(Duration::seconds(1));
        chain.append("MOVE_CARD", "Card", format!("card-{}", i % 3), Value::Null, "alice");
    }

    for k in 1..chain.len() {
        let step = serde_json::json!({"kind": "edit", "record": k, "field": "subject_kind", "value": "Project"});
        let tampered = tamper(chain.records().to_vec(), &step).expect("records decode");
        let rebuilt = Chain::from_records(tampered, Arc::new(clock.clone())).expect("rebuild");
        let result = rebuilt.validate();
        assert!(!result.valid);
        assert_eq!(result.broken_at, Some(k as u64));
    }
}

#[test]
fn stats_snapshot() {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap());
    let mut chain = Chain::with_clock(Arc::new(clock.clone()));
    clock.advance(Duration::seconds(1));
    chain.append("CREATE_CARD", "Card", "card-1", Value::Null, "alice");
    clock.advance(Duration::seconds(1));
    chain.append("MOVE_CARD", "Card", "card-1", Value::Null, "bob");
    clock.advance(Duration::seconds(1));
    chain.append("MOVE_CARD", "Card", "card-1", Value::Null, "alice");

    insta::assert_json_snapshot!(chain.stats(), @r#"
    {
      "totalRecords": 4,
      "uniqueSubjects": 2,
      "countsByAction": {
        "CREATE_CARD": 1,
        "GENESIS": 1,
        "MOVE_CARD": 2
      },
      "countsByAuthor": {
        "alice": 2,
        "bob": 1,
        "system": 1
      },
      "latestTimestamp": "2024-06-01T08:00:03Z"
    }
    "#);
}
