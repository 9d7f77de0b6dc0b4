use std::collections::VecDeque;

/// Number of trailing output lines kept for failure diagnostics.
pub const TAIL_LINES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Receives the miner's output one line at a time, as it is produced.
pub trait OutputSink: Send + Sync {
    fn line(&self, stream: OutputStream, line: &str);
}

/// Forwards miner output to the log under the `xmrig` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl OutputSink for LogSink {
    fn line(&self, stream: OutputStream, line: &str) {
        match stream {
            OutputStream::Stdout => log::info!(target: "xmrig", "{line}"),
            OutputStream::Stderr => log::info!(target: "xmrig", "[stderr] {line}"),
        }
    }
}

#[derive(Debug)]
pub(crate) struct OutputTail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl OutputTail {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub(crate) fn push(&mut self, stream: OutputStream, line: &str) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        let line = match stream {
            OutputStream::Stdout => line.to_string(),
            OutputStream::Stderr => format!("[stderr] {line}"),
        };
        self.lines.push_back(line);
    }

    pub(crate) fn into_lines(self) -> Vec<String> {
        self.lines.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_keeps_most_recent_lines() {
        let mut tail = OutputTail::new(3);
        for i in 0..5 {
            tail.push(OutputStream::Stdout, &format!("line {i}"));
        }
        assert_eq!(tail.into_lines(), vec!["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn test_tail_tags_stderr() {
        let mut tail = OutputTail::new(TAIL_LINES);
        tail.push(OutputStream::Stdout, "speed 10s/60s/15m 812.3");
        tail.push(OutputStream::Stderr, "huge pages unavailable");
        assert_eq!(
            tail.into_lines(),
            vec!["speed 10s/60s/15m 812.3", "[stderr] huge pages unavailable"]
        );
    }
}
