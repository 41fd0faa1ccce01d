//! Followed container logs.

use std::io::{BufRead, BufReader, Read};
use std::process::Child;
use std::sync::mpsc::{self, Receiver, Sender};

/// Lines from a `logs --follow` process, stdout and stderr interleaved as
/// they arrive.
///
/// The stream ends when the process exits. Dropping it kills the process.
/// It cannot be restarted; follow again for a new stream.
pub struct LogStream {
    lines: Receiver<String>,
    child: Option<Child>,
}

impl LogStream {
    /// Stream the output of a running child.
    pub fn from_child(mut child: Child) -> Self {
        let (tx, rx) = mpsc::channel();
        if let Some(stdout) = child.stdout.take() {
            forward(stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward(stderr, tx);
        }
        Self {
            lines: rx,
            child: Some(child),
        }
    }

    /// A finished stream over fixed lines.
    #[cfg(test)]
    pub fn from_lines<I: IntoIterator<Item = String>>(lines: I) -> Self {
        let (tx, rx) = mpsc::channel();
        for line in lines {
            let _ = tx.send(line);
        }
        Self {
            lines: rx,
            child: None,
        }
    }
}

fn forward<R: Read + Send + 'static>(pipe: R, tx: Sender<String>) {
    std::thread::spawn(move || {
        for line in BufReader::new(pipe).lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
}

impl Iterator for LogStream {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        match self.lines.recv() {
            Ok(line) => Some(line),
            Err(_) => {
                if let Some(mut child) = self.child.take() {
                    let _ = child.wait();
                }
                None
            }
        }
    }
}

impl Drop for LogStream {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};

    #[test]
    fn test_stream_ends_with_process() {
        let child = Command::new("sh")
            .args(["-c", "echo one; echo two"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();

        let lines: Vec<String> = LogStream::from_child(child).collect();
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn test_drop_stops_endless_stream() {
        let child = Command::new("sh")
            .args(["-c", "while true; do echo tick; sleep 0.05; done"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();

        let first: Vec<String> = LogStream::from_child(child).take(2).collect();
        assert_eq!(first, vec!["tick", "tick"]);
    }

    #[test]
    fn test_from_lines() {
        let stream = LogStream::from_lines(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(stream.count(), 2);
    }
}
