use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use pushup_common::{FrameObservation, FrameReport, PostureState};
use pushup_motion::{Classify, PostureFeatures, RepetitionCounter};
use crate::error::{EngineError, Result};
use crate::report::ReportProxy;

enum Command {
    /// Ask for the counters of the session so far
    Summary {
        respond_to: oneshot::Sender<SessionSummary>,
    },
    /// Stop consuming frames, the session ends with what it has counted
    Stop,
}

/// Totals of a session, the final one is the result of the analysis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    /// Frames consumed, with or without landmarks
    pub frames: u64,
    /// Frames skipped because the subject was not detected
    pub undetected: u64,
    /// Push-ups completed
    pub repetitions: u32,
    /// Posture of the last classified frame
    pub last_state: Option<PostureState>,
}

/// Analysis of a single video: one classifier, one counter
struct Session {
    receiver: mpsc::Receiver<Command>,
    frames: mpsc::Receiver<FrameObservation>,
    report: ReportProxy,

    classifier: Box<dyn Classify + Send + Sync>,
    counter: RepetitionCounter,
    summary: SessionSummary,
}

#[derive(Clone, Debug)]
pub struct SessionProxy(mpsc::Sender<Command>);
impl SessionProxy {
    pub async fn summary(&self) -> Result<SessionSummary> {
        let (tx, rx) = oneshot::channel();
        self.0
            .send(Command::Summary { respond_to: tx })
            .await
            .map_err(|_| EngineError::ChannelClosed("session"))?;
        rx.await.map_err(|_| EngineError::ChannelClosed("session"))
    }

    pub async fn stop(&self) -> Result<()> {
        self.0
            .send(Command::Stop)
            .await
            .map_err(|_| EngineError::ChannelClosed("session"))
    }
}

impl Session {
    fn instantiate(
        classifier: Box<dyn Classify + Send + Sync>,
        frames: mpsc::Receiver<FrameObservation>,
        report: ReportProxy,
    ) -> (Self, SessionProxy) {
        // Channel used to comunicate with actor
        let (tx, rx) = mpsc::channel(16);
        (
            Self {
                receiver: rx,
                frames,
                report,
                classifier,
                counter: RepetitionCounter::new(),
                summary: SessionSummary::default(),
            },
            SessionProxy(tx),
        )
    }

    /// Returns false if the session must stop
    #[tracing::instrument(skip_all)]
    fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Summary { respond_to } => {
                if respond_to.send(self.summary).is_err() {
                    tracing::warn!("summary requested but nobody is listening");
                }
                true
            }
            Command::Stop => {
                tracing::info!("session stopped at frame {}", self.summary.frames);
                false
            }
        }
    }

    #[tracing::instrument(skip_all, fields(frame = observation.frame))]
    async fn handle_frame(&mut self, observation: FrameObservation) -> Result<()> {
        if tracing::enabled!(tracing::Level::TRACE) {
            if let Some(features) = PostureFeatures::from_observation(&observation) {
                tracing::trace!(
                    left_angle = features.left_angle,
                    right_angle = features.right_angle,
                    torso_drop = features.torso_drop,
                    "posture features"
                );
            }
        }

        let state = self.classifier.classify(&observation);
        let progress = self.counter.update(state);

        self.summary.frames += 1;
        self.summary.repetitions = progress.repetitions;
        match state {
            Some(_) => self.summary.last_state = state,
            None => {
                tracing::trace!("no subject in frame");
                self.summary.undetected += 1;
            }
        }

        if progress.repetition_complete {
            self.report.repetition(observation.frame, progress.repetitions).await?;
        }

        self.report
            .frame(FrameReport {
                frame: observation.frame,
                state,
                repetitions: progress.repetitions,
            })
            .await
    }

    #[tracing::instrument(skip_all)]
    async fn run_session(mut self) -> Result<SessionSummary> {
        tracing::info!("session started");
        loop {
            tokio::select! {

                // Handle commands from other actors
                Some(cmd) = self.receiver.recv() => {
                    if !self.handle_command(cmd) {
                        break;
                    }
                },

                // Handle frames from the landmark source, in order
                frame = self.frames.recv() => {
                    match frame {
                        Some(observation) => self.handle_frame(observation).await?,
                        None => {
                            tracing::debug!("landmark stream ended");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!(
            frames = self.summary.frames,
            undetected = self.summary.undetected,
            "session ended with {} push-ups",
            self.summary.repetitions
        );
        Ok(self.summary)
    }
}

/// Start analysing the frames coming from `frames`, the task ends with the
/// summary of the session at the end of the stream or when stopped
pub fn run_session(
    classifier: Box<dyn Classify + Send + Sync>,
    frames: mpsc::Receiver<FrameObservation>,
    report: ReportProxy,
) -> (SessionProxy, JoinHandle<Result<SessionSummary>>) {
    let (session, proxy) = Session::instantiate(classifier, frames, report);
    let handle = tokio::spawn(session.run_session());
    (proxy, handle)
}
