//! `guardian classify`: replay a recorded sensor trace.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use guardian_sos::{AnomalyEvent, AnomalyKind, ClassifierState, MotionSample, SignalClassifier};

/// Arguments for the classify command
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// JSON array of motion samples
    #[arg(short, long)]
    pub trace: PathBuf,

    /// Configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,
}

/// Run the command
pub fn execute(args: ClassifyArgs) -> Result<()> {
    let config = crate::load_config(args.config.as_deref())?;
    let contents = std::fs::read_to_string(&args.trace)
        .with_context(|| format!("reading trace {}", args.trace.display()))?;
    let samples: Vec<MotionSample> =
        serde_json::from_str(&contents).context("trace must be a JSON array of samples")?;

    let events = replay(&SignalClassifier::new(config.classifier), &samples);

    if args.json {
        for event in &events {
            println!("{}", serde_json::to_string(event)?);
        }
        return Ok(());
    }

    for event in &events {
        println!(
            "{:>10} ms  {:<20} confidence {:.2}",
            event.timestamp_ms,
            label(event.kind),
            event.confidence
        );
    }
    println!();
    println!(
        "{} samples, {} events",
        samples.len().to_string().bold(),
        events.len().to_string().bold()
    );
    Ok(())
}

/// Run every sample through `classifier`, threading its state
pub fn replay(classifier: &SignalClassifier, samples: &[MotionSample]) -> Vec<AnomalyEvent> {
    let mut state = ClassifierState::default();
    let mut all = Vec::new();
    for sample in samples {
        let (events, next) = classifier.classify(sample, state);
        state = next;
        all.extend(events);
    }
    all
}

fn label(kind: AnomalyKind) -> colored::ColoredString {
    let text = kind.to_string();
    match kind {
        AnomalyKind::SuddenHalt | AnomalyKind::ProlongedStationary => text.red().bold(),
        AnomalyKind::Sprint | AnomalyKind::RunningPattern => text.yellow(),
        AnomalyKind::UnusualRotation => text.cyan(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_detects_halt() {
        let samples = vec![
            MotionSample::accelerometer(0, 9.0, 0.0, 0.0),
            MotionSample::accelerometer(100, 0.3, 0.0, 0.0),
        ];
        let events = replay(&SignalClassifier::with_defaults(), &samples);
        assert!(events.iter().any(|e| e.kind == AnomalyKind::SuddenHalt));
    }

    #[test]
    fn test_trace_json_shape() {
        let json = r#"[
            {"accel": {"x": 0.1, "y": 0.0, "z": 0.0}, "timestamp_ms": 0},
            {"step": true, "timestamp_ms": 100},
            {"step": true, "timestamp_ms": 300}
        ]"#;
        let samples: Vec<MotionSample> = serde_json::from_str(json).unwrap();
        let events = replay(&SignalClassifier::with_defaults(), &samples);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, AnomalyKind::RunningPattern);
    }
}
