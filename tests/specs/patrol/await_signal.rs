//! Await-signal specs (feed tailing without a tracker).

use crate::prelude::*;
use std::io::Write;

#[test]
fn times_out_quietly_without_traffic() {
    let town = make_town();
    cli()
        .args(&["await-signal", "--timeout", "1s", "--quiet"])
        .town(&town)
        .passes()
        .stdout_has("timeout");
}

#[test]
fn json_output_reports_the_reason() {
    let town = make_town();
    let out = cli()
        .args(&["await-signal", "--timeout", "1s", "--quiet", "--json"])
        .town(&town)
        .passes()
        .stdout();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["reason"], "timeout");
    assert_eq!(value["effective_timeout_secs"], 1);
}

#[test]
fn feed_traffic_wakes_the_wait() {
    let town = make_town();

    let mut child = cli()
        .args(&["await-signal", "--timeout", "30s", "--quiet"])
        .town(&town)
        .command()
        .stdout(std::process::Stdio::piped())
        .spawn()
        .unwrap();

    // Give the tail a moment to open the feed, then append a line.
    std::thread::sleep(std::time::Duration::from_millis(500));
    let mut feed = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(town.events_file())
        .unwrap();
    writeln!(
        feed,
        r#"{{"type":"sling","actor":"mayor","payload":null,"ts":"t"}}"#
    )
    .unwrap();
    drop(feed);

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("signal"), "stdout: {stdout}");
}

#[test]
fn bad_duration_is_a_usage_error() {
    let town = make_town();
    cli()
        .args(&["await-signal", "--timeout", "soon"])
        .town(&town)
        .fails();
}
