//! End-to-end reconstruction scenarios driven through the TSV reader.

use std::io::Cursor;

use bugtrail_core::config::ReplayOptions;
use bugtrail_core::row::{InputFormat, RowReader};
use bugtrail_core::{ReplayStats, SnapshotRow, run};
use serde_json::{Value, json};

fn replay_with(input: &str, format: InputFormat, options: &ReplayOptions) -> (Vec<SnapshotRow>, ReplayStats) {
    let rows = RowReader::new(Cursor::new(input.to_string()), format);
    let mut sink: Vec<SnapshotRow> = Vec::new();
    let stats = run(rows, &mut sink, options).expect("replay should succeed");
    (sink, stats)
}

fn replay(input: &str) -> (Vec<SnapshotRow>, ReplayStats) {
    replay_with(input, InputFormat::Tsv, &ReplayOptions::default())
}

fn tsv(rows: &[&str]) -> String {
    let mut out = String::from("# bug_id modified_ts modified_by field_name field_value field_value_removed attach_id _merge_order\n");
    for row in rows {
        out.push_str(&row.replace('|', "\t"));
        out.push('\n');
    }
    out
}

fn ids(rows: &[SnapshotRow]) -> Vec<&str> {
    rows.iter().map(|r| r.snapshot_id.as_str()).collect()
}

fn flag_values(body: &Value) -> Vec<String> {
    body["flags"]
        .as_array()
        .map(|flags| {
            flags
                .iter()
                .filter_map(|f| f["value"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn status_and_cc_change_in_one_changeset() {
    let input = tsv(&[
        "1|10|reporter|bug_status|NEW|||1",
        "1|10|reporter|cc|a|||2",
        "1|100|bob|bug_status|ASSIGNED|NEW||9",
        "1|100|bob|cc|b|||9",
    ]);
    let (rows, stats) = replay(&input);

    assert_eq!(ids(&rows), vec!["1.10", "1.100"]);

    let created = &rows[0].body;
    assert_eq!(created["bug_status"], "NEW");
    assert_eq!(created["cc"], json!(["a"]));
    assert_eq!(created["expires_on"], 100);
    assert_eq!(created["reported_by"], "reporter");

    let changed = &rows[1].body;
    assert_eq!(changed["bug_status"], "ASSIGNED");
    assert_eq!(changed["cc"], json!(["a", "b"]));
    assert_eq!(changed["modified_by"], "bob");
    assert!(changed.get("expires_on").is_none());

    // The head never contained "b", so undoing its addition misses.
    assert_eq!(stats.anomalies.set_membership, 1);
}

#[test]
fn attachment_appears_at_creation_and_changes_later() {
    let input = tsv(&[
        "1|10|reporter|bug_status|NEW|||1",
        "1|50|dev|isobsolete|1||10|7",
        "1|50|dev|description|fix||10|7",
        "1|200|dev|isobsolete|1|0|10|9",
    ]);
    let (rows, stats) = replay(&input);

    assert_eq!(ids(&rows), vec!["1.10", "1.50", "1.200"]);
    assert_eq!(rows[0].body["attachments"], json!([]));

    let attachment = &rows[1].body["attachments"][0];
    assert_eq!(attachment["_id"], "10.50");
    assert_eq!(attachment["isobsolete"], "0");
    assert_eq!(attachment["created_by"], "dev");
    assert_eq!(rows[1].body["expires_on"], 200);

    assert_eq!(rows[2].body["attachments"][0]["isobsolete"], "1");
    assert_eq!(stats.anomalies.total(), 0);
}

#[test]
fn attachment_created_ts_column_is_accepted() {
    let input = tsv(&[
        "1|10|reporter|bug_status|NEW|||1",
        "1|50|dev|created_ts|50||10|7",
        "1|50|dev|isobsolete|0||10|7",
    ]);
    let (rows, stats) = replay(&input);

    assert_eq!(ids(&rows), vec!["1.10", "1.50"]);
    let attachment = &rows[1].body["attachments"][0];
    assert_eq!(attachment["created_ts"], 50);
    assert_eq!(attachment["isobsolete"], "0");
    assert_eq!(stats.anomalies.total(), 0);
}

#[test]
fn attachment_created_ts_column_sets_visibility() {
    let input = tsv(&[
        "1|10|reporter|bug_status|ASSIGNED|||1",
        "1|50|dev|created_ts|1970-01-01 00:00:00.030||10|7",
        "1|50|dev|isobsolete|0||10|7",
        "1|40|triager|bug_status|ASSIGNED|NEW||9",
    ]);
    let (rows, stats) = replay(&input);

    assert_eq!(ids(&rows), vec!["1.10", "1.40", "1.50"]);
    assert_eq!(rows[0].body["attachments"], json!([]));
    assert_eq!(rows[1].body["attachments"][0]["created_ts"], 30);
    assert_eq!(rows[1].body["attachments"][0]["_id"], "10.50");
    assert_eq!(stats.anomalies.total(), 0);
}

#[test]
fn flag_visible_only_while_set() {
    let input = tsv(&[
        "1|10|reporter|bug_status|NEW|||1",
        "1|300|rev|flagtypes.name|review+|||9",
        "1|400|rev|flagtypes.name||review+||9",
    ]);
    let (rows, stats) = replay(&input);

    assert_eq!(ids(&rows), vec!["1.10", "1.300", "1.400"]);
    assert!(flag_values(&rows[0].body).is_empty());
    assert_eq!(flag_values(&rows[1].body), vec!["review+"]);
    assert_eq!(rows[1].body["flags"][0]["modified_ts"], 300);
    assert_eq!(rows[1].body["flags"][0]["name"], "review");
    assert!(flag_values(&rows[2].body).is_empty());
    assert_eq!(stats.anomalies.total(), 0);
}

#[test]
fn undoing_addition_of_missing_flag_is_logged_not_fatal() {
    let input = tsv(&[
        "1|10|reporter|bug_status|RESOLVED|||1",
        "1|10|reporter|flags|blocking+|||8",
        "1|300|rev|flagtypes.name|review+|||9",
        "1|500|dev|bug_status|RESOLVED|NEW||9",
    ]);
    let (rows, stats) = replay(&input);

    assert_eq!(stats.anomalies.set_membership, 1);
    assert_eq!(ids(&rows), vec!["1.10", "1.300", "1.500"]);
    assert_eq!(flag_values(&rows[0].body), vec!["blocking+"]);
    assert_eq!(rows[0].body["bug_status"], "NEW");
    assert_eq!(rows[2].body["bug_status"], "RESOLVED");
}

#[test]
fn attachment_flag_history() {
    let input = tsv(&[
        "1|10|reporter|bug_status|NEW|||1",
        "1|50|dev|ispatch|1||10|7",
        "1|90|rev|flags|review+||10|8",
        "1|80|dev|flagtypes.name|review?(rev)||10|9",
        "1|90|rev|flagtypes.name|review+|review?(rev)|10|9",
    ]);
    let (rows, stats) = replay(&input);

    assert_eq!(ids(&rows), vec!["1.10", "1.50", "1.80", "1.90"]);
    let flags_at = |idx: usize| flag_values(&rows[idx].body["attachments"][0]);
    assert!(flags_at(1).is_empty());
    assert_eq!(flags_at(2), vec!["review?(rev)"]);
    assert_eq!(flags_at(3), vec!["review+"]);
    assert_eq!(stats.anomalies.total(), 0);
}

/// Body with version metadata dropped and flags reduced to their values.
fn state_of(body: &Value) -> Value {
    let mut state = body.clone();
    let Some(map) = state.as_object_mut() else {
        return state;
    };
    for key in ["_id", "modified_ts", "modified_by", "expires_on", "measurements"] {
        map.remove(key);
    }
    map.insert("flags".into(), json!(flag_values(body)));
    if let Some(attachments) = map.get_mut("attachments").and_then(Value::as_array_mut) {
        for attachment in attachments {
            let values = flag_values(attachment);
            attachment["flags"] = json!(values);
        }
    }
    state
}

#[test]
fn last_snapshot_matches_head_with_flags_and_attachments() {
    let current = [
        "1|10|reporter|bug_status|RESOLVED|||1",
        "1|10|reporter|cc|amy|||2",
        "1|10|reporter|cc|bob|||2",
        "1|10|reporter|flags|blocking+|||8",
        "1|50|dev|ispatch|1||10|7",
        "1|50|dev|isobsolete|1||10|7",
        "1|90|rev|flags|review+||10|8",
    ];
    let activity = [
        "1|60|bob|cc|bob|||9",
        "1|70|rev|flagtypes.name|blocking+|||9",
        "1|80|dev|flagtypes.name|review?(rev)||10|9",
        "1|90|rev|flagtypes.name|review+|review?(rev)|10|9",
        "1|95|dev|isobsolete|1|0|10|9",
        "1|120|dev|bug_status|RESOLVED|NEW||9",
    ];
    let (head_rows, _) = replay(&tsv(&current));
    let head = &head_rows.last().expect("head snapshot").body;

    let all: Vec<&str> = current.iter().chain(activity.iter()).copied().collect();
    let (rows, stats) = replay(&tsv(&all));

    assert_eq!(stats.anomalies.total(), 0);
    assert_eq!(
        ids(&rows),
        vec!["1.10", "1.50", "1.60", "1.70", "1.80", "1.90", "1.95", "1.120"]
    );
    let last = &rows.last().expect("snapshots").body;
    assert_eq!(state_of(last), state_of(head));
    assert_eq!(flag_values(last), vec!["blocking+"]);
    assert_eq!(flag_values(&last["attachments"][0]), vec!["review+"]);
    assert_eq!(last["attachments"][0]["isobsolete"], "1");

    let created = &rows[0].body;
    assert_eq!(created["bug_status"], "NEW");
    assert_eq!(created["cc"], json!(["amy"]));
    assert!(flag_values(created).is_empty());
    assert_eq!(rows[1].body["attachments"][0]["isobsolete"], "0");
    assert!(flag_values(&rows[1].body["attachments"][0]).is_empty());
}

#[test]
fn same_field_events_in_one_changeset_resolve_by_input_order() {
    let input = tsv(&[
        "1|10|reporter|bug_status|RESOLVED|||1",
        "1|100|bob|bug_status|ASSIGNED|NEW||9",
        "1|100|bob|bug_status|RESOLVED|ASSIGNED||9",
    ]);
    let (rows, stats) = replay(&input);

    assert_eq!(ids(&rows), vec!["1.10", "1.100"]);
    // Undone in input order, the second event's old value is kept.
    assert_eq!(rows[0].body["bug_status"], "ASSIGNED");
    assert_eq!(rows[1].body["bug_status"], "RESOLVED");
    assert_eq!(stats.anomalies.total(), 0);
}

#[test]
fn same_field_tie_listed_out_of_order_keeps_last_event() {
    let input = tsv(&[
        "1|10|reporter|bug_status|RESOLVED|||1",
        "1|100|bob|bug_status|RESOLVED|ASSIGNED||9",
        "1|100|bob|bug_status|ASSIGNED|NEW||9",
    ]);
    let (rows, _) = replay(&input);

    assert_eq!(ids(&rows), vec!["1.10", "1.100"]);
    assert_eq!(rows[0].body["bug_status"], "NEW");
    assert_eq!(rows[1].body["bug_status"], "ASSIGNED");
}

#[test]
fn snapshots_carry_status_measurements() {
    let day = 86_400_000_i64;
    let reopened_at = 3 * day;
    let input = tsv(&[
        "1|0|reporter|bug_status|REOPENED|||1",
        &format!("1|{day}|dev|bug_status|RESOLVED|NEW||9"),
        &format!("1|{reopened_at}|qa|bug_status|REOPENED|RESOLVED||9"),
    ]);
    let (rows, _) = replay(&input);

    let measured: Vec<&Value> = rows.iter().map(|r| &r.body["measurements"]).collect();
    assert_eq!(measured[0]["number"], 1);
    assert!(measured[0].get("previous_status").is_none());
    assert_eq!(measured[0]["days_in_status"], 1);

    assert_eq!(measured[1]["previous_status"], "NEW");
    assert_eq!(measured[1]["days_in_previous_status"], 1);
    assert_eq!(measured[1]["days_in_status"], 2);

    assert_eq!(measured[2]["number"], 3);
    assert_eq!(measured[2]["days_in_previous_status"], 2);
    assert_eq!(measured[2]["days_in_status"], -1);
    assert_eq!(measured[2]["times_reopened"], 1);

    let options = ReplayOptions {
        measure: false,
        ..ReplayOptions::default()
    };
    let (rows, _) = replay_with(&input, InputFormat::Tsv, &options);
    assert!(rows.iter().all(|r| r.body.get("measurements").is_none()));
}

#[test]
fn record_without_activity_is_one_open_snapshot() {
    let input = tsv(&[
        "7|10|reporter|bug_status|NEW|||1",
        "7|10|reporter|priority|P2|||1",
        "7|10|reporter|keywords|crash|||2",
    ]);
    let (rows, stats) = replay(&input);

    assert_eq!(ids(&rows), vec!["7.10"]);
    let body = &rows[0].body;
    assert!(body.get("expires_on").is_none());
    assert_eq!(body["priority"], "P2");
    assert_eq!(body["keywords"], json!(["crash"]));
    assert_eq!(stats.records, 1);
}

#[test]
fn cc_is_sorted_on_output() {
    let input = tsv(&[
        "1|10|reporter|bug_status|NEW|||1",
        "1|10|reporter|cc|zed|||2",
        "1|10|reporter|cc|amy|||2",
        "1|10|reporter|keywords|b|||2",
        "1|10|reporter|keywords|a|||2",
    ]);
    let (rows, _) = replay(&input);
    assert_eq!(rows[0].body["cc"], json!(["amy", "zed"]));
    assert_eq!(rows[0].body["keywords"], json!(["b", "a"]));

    let options = ReplayOptions {
        stabilize: false,
        ..ReplayOptions::default()
    };
    let (rows, _) = replay_with(&input, InputFormat::Tsv, &options);
    assert_eq!(rows[0].body["cc"], json!(["zed", "amy"]));
}

#[test]
fn uncertain_dependency_values_are_matched() {
    let input = tsv(&[
        "1|10|reporter|bug_status|NEW|||1",
        "1|10|reporter|dependson|123|||2",
        "1|60|dev|dependson|? 123|||9",
    ]);
    let (rows, stats) = replay(&input);
    assert_eq!(stats.anomalies.total(), 0);
    assert_eq!(rows[0].body["dependson"], json!([]));
}

#[test]
fn sentinel_row_flushes_last_bug() {
    let input = tsv(&[
        "1|10|reporter|bug_status|NEW|||1",
        "2|20|reporter|bug_status|NEW|||1",
        "999999999|0||||||1",
    ]);
    let (rows, stats) = replay(&input);
    assert_eq!(ids(&rows), vec!["1.10", "2.20"]);
    assert_eq!(stats.records, 2);
    assert_eq!(stats.ignored_rows, 1);
}

#[test]
fn out_of_order_bug_is_still_reconstructed() {
    let input = tsv(&[
        "5|10|reporter|bug_status|NEW|||1",
        "3|10|reporter|bug_status|NEW|||1",
    ]);
    let (rows, stats) = replay(&input);
    assert_eq!(ids(&rows), vec!["5.10", "3.10"]);
    assert_eq!(stats.out_of_order, 1);
}

#[test]
fn unknown_source_tags_are_skipped() {
    let input = tsv(&[
        "1|10|reporter|bug_status|NEW|||1",
        "1|10|reporter|longdesc|hello|||4",
    ]);
    let (rows, stats) = replay(&input);
    assert!(rows[0].body.get("longdesc").is_none());
    assert_eq!(stats.ignored_rows, 1);
}

#[test]
fn tags_from_unknown_tables_do_not_stop_the_stream() {
    let input = tsv(&[
        "1|10|reporter|bug_status|NEW|||1",
        "1|10|reporter|longdesc|hello|||300",
        "2|20|reporter|bug_status|NEW|||1",
    ]);
    let (rows, stats) = replay(&input);
    assert_eq!(ids(&rows), vec!["1.10", "2.20"]);
    assert_eq!(stats.ignored_rows, 1);
    assert_eq!(stats.anomalies.total(), 0);
}

#[test]
fn missing_anchor_still_emits() {
    let input = tsv(&["4|30|bob|bug_status|ASSIGNED|NEW||9"]);
    let (rows, stats) = replay(&input);
    assert_eq!(stats.anomalies.missing_anchor, 1);
    assert_eq!(ids(&rows), vec!["4.30"]);
}

#[test]
fn jsonl_input_matches_tsv() {
    let tsv_input = tsv(&[
        "1|10|reporter|bug_status|NEW|||1",
        "1|100|bob|bug_status|NEW|UNCONFIRMED||9",
    ]);
    let jsonl_input = [
        json!({"bug_id": 1, "modified_ts": 10, "modified_by": "reporter",
               "field_name": "bug_status", "field_value": "NEW", "_merge_order": 1}),
        json!({"bug_id": 1, "modified_ts": 100, "modified_by": "bob",
               "field_name": "bug_status", "field_value": "NEW",
               "field_value_removed": "UNCONFIRMED", "_merge_order": 9}),
    ]
    .iter()
    .map(Value::to_string)
    .collect::<Vec<_>>()
    .join("\n");

    let (from_tsv, _) = replay(&tsv_input);
    let (from_jsonl, _) = replay_with(&jsonl_input, InputFormat::Jsonl, &ReplayOptions::default());
    assert_eq!(from_tsv, from_jsonl);
}
