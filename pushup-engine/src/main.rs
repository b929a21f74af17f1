use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod report;
mod session;
mod source;

use config::EngineConfig;
use error::EngineError;
use session::SessionSummary;
use source::LandmarkStream;

#[derive(Parser, Debug)]
#[command(version, about = "Count push-ups in a landmark stream recorded from a video", long_about = None)]
struct Args {
    /// Landmark stream produced by the pose estimator, one JSON frame per line
    input: PathBuf,
    /// Engine configuration (JSON), missing fields take the default values
    #[arg(short, long, env = "PUSHUP_CONFIG")]
    config: Option<PathBuf>,
    /// Percentage of the video to skip before counting, overrides the configuration
    #[arg(long, value_name = "PERCENT")]
    start_offset: Option<f32>,
    /// Write the state and count of every frame to this file (JSON lines)
    #[arg(short, long)]
    report: Option<PathBuf>,
    /// Log as JSON instead of compact text
    #[arg(long)]
    log_json: bool,
    /// Print the final summary as JSON
    #[arg(long)]
    json: bool,
}

fn setup_tracing(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_file(false)                       // Display source code file paths
        .with_line_number(false)                // Display source code line numbers
        .with_target(false)                     // Don't display the event's target (module path)
        .with_writer(std::io::stderr);          // Keep stdout for the result

    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

async fn analyse(args: &Args, config: &EngineConfig) -> error::Result<SessionSummary> {
    let mut stream = LandmarkStream::from_file(&args.input)?;
    let properties = stream.properties();
    tracing::info!(
        frames = properties.frames_total,
        detected = properties.frames_detected,
        "landmark stream loaded from {}",
        args.input.display()
    );

    let skipped = stream.fast_forward(config.start_offset_percent)?;
    if let (true, Some(first)) = (skipped > 0, stream.frames().first()) {
        tracing::info!("fast forward to frame {}, {} frames skipped", first.frame, skipped);
    }

    let (report, report_handle) = report::run_report_sink(args.report.as_deref(), config.channel_capacity)?;
    let (source_handle, frames) = source::run_landmark_source(stream, config.channel_capacity);
    let (session, session_handle) = session::run_session(config.classifier.build(), frames, report);

    // Stop counting on CTRL-C, what was counted so far is still reported
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            if let Ok(progress) = session.summary().await {
                tracing::warn!("interrupted after {} frames", progress.frames);
            }
            if let Err(e) = session.stop().await {
                tracing::debug!("session already ended: {}", e);
            }
        }
    });

    let session_result = session_handle.await?;
    interrupt.abort();

    // The report sink drops its channel when it fails, its error is the cause
    let summary = match session_result {
        Ok(summary) => summary,
        Err(EngineError::ChannelClosed("report")) => {
            report_handle.await??;
            return Err(EngineError::ChannelClosed("report"));
        }
        Err(e) => return Err(e),
    };

    // An interrupted session leaves the source with nobody to send to
    if let Err(e) = source_handle.await? {
        tracing::debug!("landmark source ended early: {}", e);
    }

    let written = report_handle.await??;
    if let Some(path) = &args.report {
        tracing::info!("{} frame reports written to {}", written, path.display());
    }
    Ok(summary)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    setup_tracing(args.log_json);

    let mut config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(offset) = args.start_offset {
        config.start_offset_percent = offset;
    }
    config.validate()?;
    tracing::debug!("{:?}", config);

    let rt = tokio::runtime::Runtime::new()?;
    let summary = rt.block_on(analyse(&args, &config))?;

    if args.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        println!("Push-ups: {}", summary.repetitions);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(input: PathBuf, report: Option<PathBuf>) -> Args {
        Args {
            input,
            config: None,
            start_offset: None,
            report,
            log_json: false,
            json: false,
        }
    }

    fn line(frame: u64, forearm: (f32, f32)) -> String {
        let (x, y) = forearm;
        format!(
            concat!(
                r#"{{"frame": {}, "landmarks": {{"#,
                r#""left_shoulder": [0.7, 0.5], "left_elbow": [0.7, 0.6], "left_wrist": [{}, {}], "#,
                r#""right_shoulder": [0.3, 0.5], "right_elbow": [0.3, 0.6], "right_wrist": [{}, {}], "#,
                r#""left_hip": [0.65, 0.52], "right_hip": [0.35, 0.52]}}}}"#,
                "\n"
            ),
            frame,
            0.7 + x, 0.6 + y,
            0.3 - x, 0.6 + y,
        )
    }

    fn recording() -> String {
        let up = (0.0, 0.1);
        let mid = (0.1, 0.1);
        let down = (0.1, 0.0);
        let mut text = String::new();
        let mut frame = 0;
        for _ in 0..3 {
            for forearm in [up, up, mid, down, down, mid, up] {
                text.push_str(&line(frame, forearm));
                frame += 1;
            }
            text.push_str(&format!("{{\"frame\": {frame}, \"landmarks\": null}}\n"));
            frame += 1;
        }
        text
    }

    #[test]
    fn arguments() {
        let args = Args::try_parse_from(["pushup-engine", "video.jsonl", "--start-offset", "10", "-r", "out.jsonl"]).unwrap();
        assert_eq!(args.input, PathBuf::from("video.jsonl"));
        assert_eq!(args.start_offset, Some(10.0));
        assert_eq!(args.report, Some(PathBuf::from("out.jsonl")));
        assert!(Args::try_parse_from(["pushup-engine"]).is_err());
    }

    #[tokio::test]
    async fn analyse_recording() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("video.jsonl");
        let output = dir.path().join("report.jsonl");
        std::fs::File::create(&input).unwrap().write_all(recording().as_bytes()).unwrap();

        let summary = analyse(&args(input, Some(output.clone())), &EngineConfig::default())
            .await
            .unwrap();
        assert_eq!(summary.frames, 24);
        assert_eq!(summary.undetected, 3);
        assert_eq!(summary.repetitions, 3);

        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(written.lines().count(), 24);
    }

    #[tokio::test]
    async fn analyse_with_start_offset() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("video.jsonl");
        std::fs::write(&input, recording()).unwrap();

        // 24 frames, skip 6: the first repetition is lost
        let config = EngineConfig {
            start_offset_percent: 25.0,
            ..Default::default()
        };
        let summary = analyse(&args(input, None), &config).await.unwrap();
        assert_eq!(summary.frames, 18);
        assert_eq!(summary.repetitions, 2);
    }

    #[tokio::test]
    async fn analyse_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = analyse(&args(dir.path().join("nope.jsonl"), None), &EngineConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Io { .. }), "{err}");
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn analyse_reports_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("video.jsonl");
        let text: String = (0..2000)
            .map(|frame| format!("{{\"frame\": {frame}, \"landmarks\": null}}\n"))
            .collect();
        std::fs::write(&input, text).unwrap();

        // Every write to /dev/full fails with ENOSPC once the buffer is flushed
        let err = analyse(&args(input, Some(PathBuf::from("/dev/full"))), &EngineConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Report(_)), "{err}");
    }
}
