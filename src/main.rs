use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::thread;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use steamwatch::counter::NetworkCounterSource;
use steamwatch::engine::{ChannelSink, SessionEvent, Tracker};
use steamwatch::model::{DownloadState, PollSchedule, StatusSnapshot};

#[derive(Parser, Debug)]
#[command(name = "steamwatch", version, about = "Track Steam download activity by watching its on-disk state")]
struct Args {
    /// Seconds between status checks.
    #[arg(long, default_value_t = 60)]
    interval: u64,

    /// Total monitoring window in seconds.
    #[arg(long, default_value_t = 300)]
    duration: u64,

    /// Mirror output into this log file.
    #[arg(long, default_value = "steamwatch.log")]
    log_file: PathBuf,

    /// Emit each snapshot as a JSON line instead of formatted text.
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_dir = args.log_file.parent().filter(|p| !p.as_os_str().is_empty());
    let file_name = args
        .log_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "steamwatch.log".to_string());
    let appender =
        tracing_appender::rolling::never(log_dir.unwrap_or_else(|| std::path::Path::new(".")), file_name);
    let (file_writer, _guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_target(false).with_ansi(false).with_writer(file_writer))
        .init();

    // Host writes the flag, engine reads it: stop takes effect within one
    // sleep slice, not the full remaining window.
    let cancel = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        if let Err(err) = signal_hook::flag::register(signal, Arc::clone(&cancel)) {
            warn!(signal, "failed to register signal handler: {}", err);
        }
    }

    let schedule = PollSchedule::new(args.interval, args.duration);
    let tracker = Tracker::new(schedule, Box::new(NetworkCounterSource::new()));

    // The session runs on its own thread so polling can never stall the
    // host; snapshots come back over the channel.
    let (tx, rx) = mpsc::channel();
    let engine_cancel = Arc::clone(&cancel);
    let handle = thread::spawn(move || {
        let mut sink = ChannelSink::new(tx);
        tracker.run(engine_cancel, &mut sink)
    });

    for event in rx {
        match event {
            SessionEvent::Snapshot(snapshot) => report(&snapshot, args.json),
            SessionEvent::Terminal(reason) => info!(reason = ?reason, "session finished"),
        }
    }

    match handle.join() {
        Ok(Ok(_)) => ExitCode::SUCCESS,
        Ok(Err(err)) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
        Err(_) => {
            error!("monitoring thread panicked");
            ExitCode::FAILURE
        }
    }
}

fn report(snapshot: &StatusSnapshot, json: bool) {
    if json {
        match serde_json::to_string(snapshot) {
            Ok(line) => println!("{}", line),
            Err(err) => warn!("failed to encode snapshot: {}", err),
        }
        return;
    }

    let tick = snapshot.tick_index + 1;
    match snapshot.state {
        DownloadState::Active => {
            let item = snapshot.item_label.as_deref().unwrap_or("unknown app");
            info!(
                tick,
                item,
                rate = %format_rate(snapshot.rate_bytes_per_sec),
                "downloading"
            );
        }
        DownloadState::Paused => info!(tick, "download paused"),
        DownloadState::Completed => info!(tick, "download completed"),
        DownloadState::Idle => info!(tick, "no active downloads"),
        DownloadState::Unknown => info!(tick, "download state unknown"),
        DownloadState::Error => warn!(tick, "check failed, will retry next tick"),
    }
}

fn format_rate(bytes_per_sec: f64) -> String {
    if bytes_per_sec >= 1_048_576.0 {
        format!("{:.2} MB/s", bytes_per_sec / 1_048_576.0)
    } else if bytes_per_sec >= 1024.0 {
        format!("{:.2} KB/s", bytes_per_sec / 1024.0)
    } else {
        format!("{:.0} B/s", bytes_per_sec)
    }
}
