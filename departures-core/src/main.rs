use std::process::ExitCode;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use departures_core::config::{BoardConfig, BoardKind};
use departures_core::darwin::RailClient;
use departures_core::domain::{StationRecord, UpdateCode};
use departures_core::feed::{BoardError, Progress, outcome};
use departures_core::http::{NetConnector, TrustPolicy};
use departures_core::tfl::TflClient;
use departures_core::update::{FileSlot, UpdateError, UpdateOutcome, UpdateProgress, Updater};
use departures_core::weather::{WeatherClient, next_refresh};

enum Board {
    Rail(RailClient<NetConnector>),
    Underground(TflClient<NetConnector>),
}

impl Board {
    async fn poll(&mut self, live: &mut StationRecord) -> Result<UpdateCode, BoardError> {
        let progress = |p: Progress| tracing::trace!(?p, "progress");
        match self {
            Board::Rail(client) => client.update_departures(live, progress).await,
            Board::Underground(client) => client.update_arrivals(live, progress).await,
        }
    }
}

/// Log update progress each time the percentage moves.
fn log_progress(what: &'static str) -> impl FnMut(UpdateProgress) {
    let mut last = None;
    move |p: UpdateProgress| {
        let percent = p.percent();
        if last != Some(percent) {
            last = Some(percent);
            debug!(what, percent, file = p.file, files = p.files, "update progress");
        }
    }
}

async fn check_for_updates(config: &BoardConfig, connector: NetConnector) -> Result<(), UpdateError> {
    let settings = &config.update;
    let mut updater = Updater::new(connector, config.release());
    let release = updater.check_latest().await?;

    let mut slot = FileSlot::new(&settings.firmware_path, settings.firmware_capacity);
    match updater
        .update_firmware(&release, settings.running_firmware(), &mut slot, log_progress("firmware"))
        .await?
    {
        UpdateOutcome::Applied(version) => info!(%version, "firmware updated, restart to run it"),
        UpdateOutcome::UpToDate => {}
    }

    tokio::fs::create_dir_all(&settings.web_dir).await?;
    updater
        .update_web_bundle(
            &release,
            &settings.web_dir,
            &settings.web_marker,
            log_progress("web bundle"),
        )
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match BoardConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "cannot load configuration");
            return ExitCode::FAILURE;
        }
    };

    if config.trust == TrustPolicy::AcceptAny {
        warn!("server certificates are not verified");
    }
    let connector = match NetConnector::new(config.trust) {
        Ok(connector) => connector,
        Err(e) => {
            error!(error = %e, "cannot set up TLS");
            return ExitCode::FAILURE;
        }
    };

    if config.update.enabled {
        if let Err(e) = check_for_updates(&config, connector.clone()).await {
            warn!(error = %e, code = %e.code(), "update check failed");
        }
    }

    let weather = config
        .weather()
        .map(|w| WeatherClient::new(connector.clone(), w));
    let mut next_weather = Instant::now();

    let mut live = StationRecord::new();
    let mut board = match &config.board {
        BoardKind::Rail { .. } => config
            .rail()
            .map(|rail| Board::Rail(RailClient::new(connector, rail))),
        BoardKind::Underground { location, .. } => {
            live.location.set(location);
            config
                .underground()
                .map(|tfl| Board::Underground(TflClient::new(connector, tfl)))
        }
    };
    let Some(board) = board.as_mut() else {
        error!("board configuration does not match its kind");
        return ExitCode::FAILURE;
    };

    let mut interval = tokio::time::interval(config.poll_interval());
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let result = board.poll(&mut live).await;
                let code = outcome(&result);
                match &result {
                    Ok(UpdateCode::Success) => info!(code = code.as_u8(), "board changed\n{live}"),
                    Ok(_) => info!(code = code.as_u8(), result = %code, "board unchanged"),
                    Err(e) => warn!(code = code.as_u8(), error = %e, "board update failed"),
                }
            }
            _ = tokio::time::sleep_until(next_weather), if weather.is_some() => {
                let Some(client) = &weather else { continue };
                let result = client.update_weather(|_| {}).await;
                if let Err(e) = &result {
                    warn!(code = e.code().as_u8(), error = %e, "weather update failed");
                }
                next_weather = Instant::now() + next_refresh(&result);
            }
        }
    }
}
