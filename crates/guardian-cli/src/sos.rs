//! `guardian sos`: one countdown and dispatch against console transports.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use guardian_sos::adapter::{InMemoryAlertStore, StaticContactRepository, StaticLocationProvider};
use guardian_sos::channels::{EmailChannel, PushChannel, SmsChannel};
use guardian_sos::{
    AlertDispatcher, ChannelKind, Contact, FixSource, LocationFix, LocationResolver, SosSnapshot,
    SosState, StartOutcome, UserProfile,
};

use crate::console::{ConsoleEmail, ConsolePush, ConsoleSms};

/// Arguments for the sos command
#[derive(Args, Debug)]
pub struct SosArgs {
    /// JSON array of contacts
    #[arg(long)]
    pub contacts: PathBuf,

    /// Countdown in seconds (defaults to the configured value)
    #[arg(long)]
    pub countdown: Option<u64>,

    /// Cancel this many milliseconds after the countdown starts
    #[arg(long)]
    pub cancel_after_ms: Option<u64>,

    /// Simulate a device without location permission
    #[arg(long)]
    pub no_location: bool,

    /// Last known latitude
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Last known longitude
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lng: Option<f64>,

    /// Make every SMS fail
    #[arg(long)]
    pub fail_sms: bool,

    /// Sender display name
    #[arg(long, default_value = "Guardian user")]
    pub name: String,

    /// Configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Run the command
pub async fn execute(args: SosArgs) -> Result<()> {
    let config = crate::load_config(args.config.as_deref())?;
    let contents = std::fs::read_to_string(&args.contacts)
        .with_context(|| format!("reading contacts {}", args.contacts.display()))?;
    let contacts: Vec<Contact> =
        serde_json::from_str(&contents).context("contacts must be a JSON array")?;

    let mut provider = StaticLocationProvider::new();
    if let (Some(lat), Some(lng)) = (args.lat, args.lng) {
        provider = provider.with_cached(LocationFix::new(lat, lng, 10.0, FixSource::Cached));
    }
    if args.no_location {
        provider = provider.without_permission();
    }

    let store = Arc::new(InMemoryAlertStore::new());
    let dispatcher = AlertDispatcher::builder(UserProfile::new("cli-user", args.name.clone()))
        .config(config.dispatch.clone())
        .contacts(Arc::new(StaticContactRepository::new(contacts)))
        .location(LocationResolver::new(Arc::new(provider)))
        .store(store.clone())
        .channel(Arc::new(SmsChannel::new(
            Arc::new(ConsoleSms { fail: args.fail_sms }),
            config.dispatch.sms_segment_chars,
        )))
        .channel(Arc::new(PushChannel::new(Arc::new(ConsolePush))))
        .channel(Arc::new(EmailChannel::new(Arc::new(ConsoleEmail))))
        .build()?;

    let countdown = args
        .countdown
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.dispatch.default_countdown());

    let mut updates = dispatcher.subscribe();
    if dispatcher.start_countdown(countdown) == StartOutcome::InvalidDuration {
        anyhow::bail!("countdown of {}s is out of range", countdown.as_secs());
    }
    println!("{} {}s", "SOS countdown:".bold(), countdown.as_secs());

    if let Some(ms) = args.cancel_after_ms {
        let canceller = dispatcher.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            if !canceller.cancel() {
                tracing::warn!("Too late to cancel; alert already sending");
            }
        });
    }

    let mut last = SosState::Countdown;
    let mut final_snapshot: Option<SosSnapshot> = None;
    while updates.changed().await.is_ok() {
        let snapshot = updates.borrow_and_update().clone();
        if snapshot.state == last {
            continue;
        }
        last = snapshot.state;
        print_state(&snapshot);
        if snapshot.state.is_terminal() {
            final_snapshot = Some(snapshot);
        }
        if last == SosState::Idle {
            break;
        }
    }

    if let Some(snapshot) = final_snapshot {
        print_summary(&snapshot);
    }
    for (id, record) in store.alerts() {
        println!(
            "{} {} status={} risk={:?}",
            "Stored alert".dimmed(),
            id,
            record.status,
            record.risk_level
        );
    }
    Ok(())
}

fn print_state(snapshot: &SosSnapshot) {
    let state = snapshot.state.to_string();
    let state = match snapshot.state {
        SosState::Succeeded => state.green().bold(),
        SosState::PartialFailure => state.red().bold(),
        SosState::Cancelled => state.yellow().bold(),
        _ => state.normal(),
    };
    match &snapshot.message {
        Some(message) => println!("-> {}  {}", state, message),
        None => println!("-> {}", state),
    }
}

fn print_summary(snapshot: &SosSnapshot) {
    let Some(summary) = &snapshot.summary else {
        return;
    };
    println!();
    println!("{}", "Delivery summary".bold());
    for kind in ChannelKind::ALL {
        println!(
            "  {:<6} sent {:>2}  failed {:>2}",
            kind.to_string(),
            summary.sent_count(kind),
            summary.failed_count(kind)
        );
    }
    if let Some(failure) = snapshot.failure {
        println!("  cause: {:?}", failure);
    }
}
