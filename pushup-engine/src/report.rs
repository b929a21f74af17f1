use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tokio::sync::mpsc::{self, Sender};
use tokio::task::JoinHandle;

use pushup_common::FrameReport;
use crate::error::{EngineError, Result};

/// Contains all commands understood by the report sink
#[derive(Debug)]
pub enum Command {
    /// Result of a single frame
    Frame(FrameReport),
    /// A repetition was completed during this frame
    Repetition { frame: u64, repetitions: u32 },
}

#[derive(Clone, Debug)]
pub struct ReportProxy(pub Sender<Command>);
impl ReportProxy {
    pub async fn frame(&self, report: FrameReport) -> Result<()> {
        self.send(Command::Frame(report)).await
    }

    pub async fn repetition(&self, frame: u64, repetitions: u32) -> Result<()> {
        self.send(Command::Repetition { frame, repetitions }).await
    }

    async fn send(&self, cmd: Command) -> Result<()> {
        self.0
            .send(cmd)
            .await
            .map_err(|_| EngineError::ChannelClosed("report"))
    }
}

/// Where frame reports end up, besides the log
struct ReportSink {
    receiver: mpsc::Receiver<Command>,
    output: Option<BufWriter<File>>,
    written: u64,
}

impl ReportSink {
    fn handle_command(&mut self, cmd: Command) -> Result<()> {
        match cmd {
            Command::Frame(report) => {
                tracing::trace!("{}", report);
                if let Some(output) = &mut self.output {
                    serde_json::to_writer(&mut *output, &report)
                        .map_err(|e| EngineError::Report(e.into()))?;
                    output.write_all(b"\n").map_err(EngineError::Report)?;
                    self.written += 1;
                }
            }
            Command::Repetition { frame, repetitions } => {
                tracing::info!(frame, "push-up count: {}", repetitions);
            }
        }
        Ok(())
    }

    fn run_report_sink(mut self) -> Result<u64> {
        while let Some(cmd) = self.receiver.blocking_recv() {
            self.handle_command(cmd)?;
        }

        if let Some(output) = &mut self.output {
            output.flush().map_err(EngineError::Report)?;
        }
        Ok(self.written)
    }
}

/// Start the report sink, frame reports are appended to `output` as JSON lines.
/// The task ends, returning the number of reports written, once every proxy is dropped.
pub fn run_report_sink(
    output: Option<&Path>,
    capacity: usize,
) -> Result<(ReportProxy, JoinHandle<Result<u64>>)> {
    let output = output
        .map(|path| {
            File::create(path)
                .map(BufWriter::new)
                .map_err(|e| EngineError::io(path, e))
        })
        .transpose()?;

    let (tx, rx) = mpsc::channel(capacity.max(1));
    let sink = ReportSink {
        receiver: rx,
        output,
        written: 0,
    };

    let handle = tokio::task::spawn_blocking(move || sink.run_report_sink());
    Ok((ReportProxy(tx), handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushup_common::PostureState;

    #[tokio::test]
    async fn reports_are_written_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.jsonl");

        let (proxy, handle) = run_report_sink(Some(path.as_path()), 8).unwrap();
        proxy.frame(FrameReport { frame: 0, state: Some(PostureState::Down), repetitions: 0 }).await.unwrap();
        proxy.frame(FrameReport { frame: 1, state: None, repetitions: 0 }).await.unwrap();
        proxy.repetition(2, 1).await.unwrap();
        proxy.frame(FrameReport { frame: 2, state: Some(PostureState::Up), repetitions: 1 }).await.unwrap();
        drop(proxy);

        assert_eq!(handle.await.unwrap().unwrap(), 3);

        let text = std::fs::read_to_string(&path).unwrap();
        let reports: Vec<FrameReport> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[1], FrameReport { frame: 1, state: None, repetitions: 0 });
        assert_eq!(reports[2].state, Some(PostureState::Up));
        assert!(text.lines().next().unwrap().contains(r#""state":"down""#));
    }

    #[tokio::test]
    async fn without_output_nothing_is_written() {
        let (proxy, handle) = run_report_sink(None, 8).unwrap();
        proxy.frame(FrameReport { frame: 0, state: None, repetitions: 0 }).await.unwrap();
        drop(proxy);
        assert_eq!(handle.await.unwrap().unwrap(), 0);
    }

    #[test]
    fn unwritable_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.jsonl");
        assert!(matches!(run_report_sink(Some(path.as_path()), 8), Err(EngineError::Io { .. })));
    }
}
