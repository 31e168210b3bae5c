use std::process::ExitCode;

use common::utils::formatters::{format_date, format_odometer, DEFAULT_DATE_FORMAT, MONTH_YEAR_FORMAT};
use configs::AppConfig;
use dotenvy::dotenv;
use service::hooks::VehicleCollection;
use service::runtime::{ensure_env, Backend};
use service::service_records::ServiceRecordRepository;
use tracing::{error, info, warn};
use uuid::Uuid;

fn init_logging() {
    // load .env first so RUST_LOG and FIXO_LOG_FORMAT apply
    dotenv().ok();
    match std::env::var("FIXO_LOG_FORMAT").as_deref() {
        Ok("json") => common::utils::logging::init_logging_json(),
        _ => common::utils::logging::init_logging_default(),
    }
    info!(service = "fixo", event = "logger_init", "tracing subscriber initialized");
}

fn load_config() -> anyhow::Result<AppConfig> {
    match AppConfig::load_and_validate() {
        Ok(cfg) => Ok(cfg),
        Err(e) => {
            warn!(service = "fixo", event = "config_file_unusable", error = %e, "falling back to environment");
            AppConfig::from_env()
        }
    }
}

/// Load every vehicle and log a one-line service summary for each.
async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    ensure_env(&cfg.store.data_dir).await?;
    let backend = Backend::from_config(&cfg)?;

    let cars = VehicleCollection::mount(backend.vehicles.clone()).await;
    if let Some(message) = cars.error().await {
        anyhow::bail!("cannot load vehicles: {message}");
    }

    let vehicles = cars.vehicles().await;
    info!(service = "fixo", event = "vehicles_loaded", count = vehicles.len(), "vehicles loaded");
    for vehicle in vehicles {
        let records = backend.service_records.list_for_vehicle(&vehicle.id).await?;
        let latest = records.first();
        let registered = vehicle
            .registration_date
            .map(|d| format_date(&d.to_string(), MONTH_YEAR_FORMAT))
            .unwrap_or_default();
        info!(
            service = "fixo",
            event = "vehicle_summary",
            vehicle_id = %vehicle.id,
            name = %vehicle.name,
            registered = %registered,
            records = records.len(),
            last_service = %latest.map(|r| format_date(&r.date.to_string(), DEFAULT_DATE_FORMAT)).unwrap_or_default(),
            odometer = %latest.map(|r| format_odometer(Some(r.odometer as f64))).unwrap_or_default(),
            "vehicle summary"
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    init_logging();

    let run_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    std::panic::set_hook(Box::new(move |info| {
        error!(service = "fixo", event = "panic", %run_id, pid, message = %info, "unhandled panic occurred");
    }));

    let cfg = match load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(service = "fixo", event = "config_invalid", error = %e, "no usable configuration");
            return ExitCode::FAILURE;
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "fixo", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    info!(service = "fixo", event = "start", %run_id, pid, version, "fixo starting");

    rt.block_on(async move {
        tokio::select! {
            res = run(cfg) => match res {
                Ok(()) => {
                    info!(service = "fixo", event = "stop", %run_id, "fixo finished");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!(service = "fixo", event = "run_failed", error = %e, "fixo run failed");
                    ExitCode::FAILURE
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!(service = "fixo", event = "shutdown_signal", %run_id, "received Ctrl+C, stopping");
                ExitCode::SUCCESS
            }
        }
    })
}
