use smartglove::domain::models::{AppEvent, GloveId, MessageSeverity};
use smartglove::domain::settings::SettingsService;
use smartglove::infrastructure::bluetooth::simulated::SimulatedTransport;
use smartglove::infrastructure::bluetooth::GloveService;
use smartglove::infrastructure::logging;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Phase advance per synthetic frame, in radians
const PHASE_STEP: f64 = 0.05;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings_service = SettingsService::new()?;
    let settings = settings_service.get().clone();
    let _log_guard = logging::init_logger(&settings.log_settings)?;

    info!("Starting SmartGlove demo host");
    if !settings_service.path().exists() {
        settings_service.save()?;
        info!("Wrote default settings to {}", settings_service.path().display());
    } else {
        info!("Settings loaded from {}", settings_service.path().display());
    }

    let (event_sender, event_receiver) = mpsc::unbounded_channel();
    tokio::spawn(log_events(event_receiver));

    let transport = Arc::new(SimulatedTransport::new());
    let mut service = GloveService::new(Arc::clone(&transport), event_sender);

    let mut connected = Vec::new();
    for glove in &settings.gloves {
        transport.add_glove(&glove.identifier);
        let id = match service.register(&glove.identifier) {
            Ok(id) => id,
            Err(e) => {
                warn!("Skipping glove {}: {}", glove.identifier, e);
                continue;
            }
        };
        service.set_joint_limits(id, glove.joint_limits())?;

        // Discovery blocks; the simulated transport answers immediately.
        match service.connect(id) {
            Ok(()) => connected.push(id),
            Err(e) => error!("{} not connected: {}", id, e),
        }
    }
    info!(
        "{} of {} gloves connected: {:?}",
        connected.len(),
        service.len(),
        service.identifiers()
    );

    let streamer = {
        let transport = Arc::clone(&transport);
        let period = Duration::from_millis(settings.simulation.notify_period_ms.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            let mut phase = 0.0;
            loop {
                ticker.tick().await;
                transport.stream_tick(phase);
                phase += PHASE_STEP;
            }
        })
    };

    let poll_interval = Duration::from_millis(settings.poll_interval_ms.max(1));
    let report_every = (1000 / poll_interval.as_millis().max(1)).max(1) as u64;
    let mut poll = tokio::time::interval(poll_interval);
    let shutdown = shutdown_signal(settings.simulation.run_secs);
    tokio::pin!(shutdown);

    let mut frame: u64 = 0;
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = poll.tick() => {
                frame += 1;
                let report = frame % report_every == 0;
                for &id in &connected {
                    poll_glove(&service, id, settings.stale_after_secs, report);
                }
            }
        }
    }

    streamer.abort();
    service.clear();
    info!("SmartGlove demo host stopped");
    Ok(())
}

/// Read one glove the way a render loop would.
fn poll_glove(
    service: &GloveService<SimulatedTransport>,
    id: GloveId,
    stale_after_secs: f64,
    report: bool,
) {
    let reading = match service.reading(id) {
        Ok(reading) => reading,
        Err(e) => {
            error!("{}: {}", id, e);
            return;
        }
    };
    debug!("{} reading {:?}", id, reading);

    if !report {
        return;
    }
    match service.seconds_since_last_notification(id) {
        Ok(Some(secs)) if secs > stale_after_secs => {
            warn!("{} silent for {:.1}s", id, secs)
        }
        Ok(None) => warn!("{} has not sent any data yet", id),
        _ => info!(
            "{} orientation [{:.1}, {:.1}, {:.1}] index [{:.1}, {:.1}, {:.1}]",
            id, reading[0], reading[1], reading[2], reading[6], reading[7], reading[8]
        ),
    }
}

async fn shutdown_signal(run_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Could not listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    if run_secs == 0 {
        ctrl_c.await;
        info!("Ctrl-C received");
        return;
    }
    tokio::select! {
        _ = ctrl_c => info!("Ctrl-C received"),
        _ = tokio::time::sleep(Duration::from_secs(run_secs)) => {
            info!("Run time of {}s elapsed", run_secs)
        }
    }
}

async fn log_events(mut receiver: mpsc::UnboundedReceiver<AppEvent>) {
    while let Some(event) = receiver.recv().await {
        match event {
            AppEvent::ConnectionStatus { glove, status } => {
                info!("{} status: {:?}", glove, status)
            }
            AppEvent::LogMessage(msg) => match msg.severity {
                MessageSeverity::Info | MessageSeverity::Success => info!("{}", msg.message),
                MessageSeverity::Warning => warn!("{}", msg.message),
                MessageSeverity::Error => error!("{}", msg.message),
            },
        }
    }
}
