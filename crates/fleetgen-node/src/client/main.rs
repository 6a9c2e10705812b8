use clap::Parser;
use core::time::Duration;
use fleetgen::{FleetGenerator, GenerationOutcome, ParentRecord};
use fleetgen_node::config::{ClientArgs, ConsumerConfig};
use fleetgen_node::shutdown::shutdown_signal;
use fleetgen_node::telemetry::init_telemetry;
use fleetgen_stream::{ClientEvent, StreamClient};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

enum Exit {
    Limit,
    Signal,
    Disconnected,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = ClientArgs::parse();
    let config = ConsumerConfig::try_from(args)?;

    init_telemetry()?;

    let client = StreamClient::new(config.client.clone());
    let mut events = client.subscribe();
    client.connect(&config.host, config.port).await?;
    client.start_requesting(config.request_interval);

    let generator = FleetGenerator::new(config.generator.clone());
    let cancel = CancellationToken::new();
    let runs = TaskTracker::new();
    let reporter = tokio::spawn(report_progress(generator.clone(), cancel.child_token()));

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut received = 0_usize;
    let exit = loop {
        let event = tokio::select! {
            () = &mut shutdown => break Exit::Signal,
            event = events.recv() => event,
        };

        match event {
            Ok(ClientEvent::RecordReceived(record)) => {
                received += 1;
                tracing::info!(
                    id = %record.id(),
                    "Received {} {} ({}, {} hp, {} km/h)",
                    record.brand,
                    record.model,
                    record.category,
                    record.horsepower,
                    record.max_speed
                );
                runs.spawn(generate_children(generator.clone(), record, cancel.clone()));

                if config.records.is_some_and(|limit| received >= limit) {
                    break Exit::Limit;
                }
            }
            Ok(ClientEvent::ConnectionStatusChanged(true)) => {
                tracing::trace!("Connection alive");
            }
            Ok(ClientEvent::ConnectionStatusChanged(false)) | Err(RecvError::Closed) => {
                break Exit::Disconnected;
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Event listener lagged, skipped {skipped} events");
            }
        }
    };

    client.stop_requesting();
    runs.close();

    match exit {
        Exit::Limit => {
            tracing::info!("Received {received} records, waiting for generations to finish");
            tokio::select! {
                () = runs.wait() => {}
                () = &mut shutdown => cancel.cancel(),
            }
        }
        Exit::Signal => {
            tracing::info!("Shutdown signal received, cancelling generations...");
            cancel.cancel();
        }
        Exit::Disconnected => {
            tracing::warn!("Connection to {}:{} lost", config.host, config.port);
            cancel.cancel();
        }
    }

    runs.wait().await;
    cancel.cancel();
    let _ = reporter.await;
    client.disconnect().await;

    tracing::info!(
        cached = generator.cached_len(),
        "Client stopped after {received} records"
    );
    Ok(())
}

async fn generate_children(
    generator: FleetGenerator,
    record: ParentRecord,
    cancel: CancellationToken,
) {
    match generator.generate(&record, &cancel).await {
        GenerationOutcome::Ready { children } => {
            tracing::info!(
                id = %record.id(),
                "Generated {} {} records for {} {}",
                children.len(),
                record.category,
                record.brand,
                record.model
            );
            for child in &children {
                tracing::debug!(id = %record.id(), "  {}", child.registration_code());
            }
        }
        GenerationOutcome::Cancelled { progress } => {
            tracing::info!(
                id = %record.id(),
                "Generation cancelled at {:.0}%",
                progress * 100.0
            );
        }
    }
}

/// Logs the generator's progress whenever it changes.
async fn report_progress(generator: FleetGenerator, cancel: CancellationToken) {
    let mut last = None;
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(PROGRESS_INTERVAL) => {}
        }

        let progress = generator.progress();
        if last != Some(progress) {
            tracing::info!("Progress: {:.0}%", progress * 100.0);
            last = Some(progress);
        }
    }
}
