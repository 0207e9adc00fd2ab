use std::io::{Read, Write};
use std::process::{Command, Stdio};

fn tsh_path() -> String {
    std::env::var("CARGO_BIN_EXE_tsh-rs").unwrap_or_else(|_| "target/debug/tsh-rs".to_string())
}

/// Runs one line through `tsh-rs -c` and returns its stdout.
fn run_line(line: &str) -> String {
    let mut child = Command::new(tsh_path())
        .arg("-c")
        .arg(line)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn tsh");
    let mut out = String::new();
    child.stdout.as_mut().unwrap().read_to_string(&mut out).unwrap();
    let status = child.wait().expect("wait tsh");
    assert!(status.success(), "tsh failed on `{line}`");
    out
}

/// The same two-stage pipe, wired by std::process.
fn os_pipe(a: &[&str], b: &[&str]) -> String {
    let mut first = Command::new(a[0]).args(&a[1..]).stdout(Stdio::piped()).spawn().expect("spawn a");
    let second = Command::new(b[0])
        .args(&b[1..])
        .stdin(first.stdout.take().expect("a stdout"))
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn b");
    let out = second.wait_with_output().expect("wait b");
    first.wait().expect("wait a");
    String::from_utf8(out.stdout).unwrap()
}

#[test]
fn two_stage_pipe_matches_the_os_pipe() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("words.txt");
    std::fs::write(&path, "pear\napple\nfig\napple\n").unwrap();
    let p = path.to_string_lossy().to_string();

    let ours = run_line(&format!("cat {p} | sort"));
    assert_eq!(ours, os_pipe(&["cat", &p], &["sort"]));
    assert_eq!(ours, "apple\napple\nfig\npear\n");
}

#[test]
fn three_stages_chain() {
    assert_eq!(run_line("echo one two three | tr a-z A-Z | wc -w").trim(), "3");
}

#[test]
fn delimiters_need_no_spaces() {
    assert_eq!(run_line("echo abc|tr a-z A-Z;echo done"), "ABC\ndone\n");
}

#[test]
fn producer_sees_eof_of_its_consumer() {
    // `yes` only stops once `head` has exited and every read end is closed
    assert_eq!(run_line("yes | head -n 3"), "y\ny\ny\n");
}

#[test]
fn large_output_streams_through() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    for i in 0..20_000 {
        writeln!(file, "line {i}").unwrap();
    }
    file.flush().unwrap();
    let p = file.path().to_string_lossy().to_string();
    assert_eq!(run_line(&format!("cat {p} | cat | wc -l")).trim(), "20000");
}

#[test]
fn segments_run_in_order() {
    assert_eq!(run_line("echo a | cat ; echo b ; echo c | cat"), "a\nb\nc\n");
}

#[test]
fn missing_stage_leaves_the_consumer_with_empty_input() {
    assert_eq!(run_line("tsh-no-such-program | wc -l").trim(), "0");
}

#[test]
fn dangling_pipe_does_not_hang() {
    assert_eq!(run_line("echo dropped |"), "");
}

#[test]
fn empty_segment_keeps_the_pipe_open() {
    assert_eq!(run_line("echo carried | ; cat"), "carried\n");
}
