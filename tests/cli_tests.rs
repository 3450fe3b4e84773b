//! End-to-end tests of the portsweep binary: exit codes and stdout format

use std::net::TcpListener;
use std::process::{Command, Output};

fn portsweep(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_portsweep"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run portsweep binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_open_port_line_and_success_exit() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port().to_string();

    let output = portsweep(&["127.0.0.1", &port, &port]);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), format!("Port {}: open\n", port));
    // Diagnostics stay off stdout
    assert!(String::from_utf8_lossy(&output.stderr).contains("Scanning ports"));
}

#[test]
fn test_closed_ports_still_exit_zero() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let port = port.to_string();

    let output = portsweep(&["127.0.0.1", &port, &port]);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), format!("Port {}: closed\n", port));
}

#[test]
fn test_lines_are_ascending_and_complete() {
    let output = portsweep(&["127.0.0.1", "1", "40", "-c", "7", "-t", "300"]);

    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    let ports: Vec<u16> = text
        .lines()
        .map(|line| {
            let rest = line.strip_prefix("Port ").expect("line format");
            rest.split(':').next().unwrap().parse().unwrap()
        })
        .collect();
    assert_eq!(ports, (1..=40).collect::<Vec<u16>>());
}

#[test]
fn test_invalid_ranges_exit_one_without_output() {
    for (start, end) in [("10", "5"), ("0", "5"), ("1", "65536"), ("-3", "4")] {
        let output = portsweep(&["127.0.0.1", start, end]);
        assert_eq!(output.status.code(), Some(1), "range {}-{}", start, end);
        assert!(output.stdout.is_empty());
        assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid port range"));
    }
}

#[test]
fn test_unresolvable_host_exits_one_without_output() {
    let output = portsweep(&["no-such-host.invalid", "20", "25"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Could not resolve hostname"));
}

#[test]
fn test_usage_errors_exit_one() {
    assert_eq!(portsweep(&["127.0.0.1", "twenty", "25"]).status.code(), Some(1));
    assert_eq!(portsweep(&["127.0.0.1"]).status.code(), Some(1));
    assert_eq!(portsweep(&["--help"]).status.code(), Some(0));
}

#[test]
fn test_oversized_concurrency_exits_one() {
    let output = portsweep(&["127.0.0.1", "1", "2", "-c", &usize::MAX.to_string()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Concurrency must be at most"));
}

#[test]
fn test_json_output() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let arg = port.to_string();

    let output = portsweep(&["127.0.0.1", &arg, &arg, "--output", "json"]);

    assert_eq!(output.status.code(), Some(0));
    let value: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(value["port"], port);
    assert_eq!(value["status"], "open");
    assert!(value["detail"].is_null());
}

#[test]
fn test_deadline_reports_every_port() {
    let output = portsweep(&["192.0.2.1", "1", "30", "-t", "5000", "--deadline", "200"]);

    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    assert_eq!(text.lines().count(), 30);
    assert!(text
        .lines()
        .all(|line| line.ends_with(": error") || line.ends_with(": filtered")));
}
