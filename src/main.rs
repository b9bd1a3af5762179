use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nav_telemetry::kernel::capture::{FrameCapture, SolidFrame};
use nav_telemetry::kernel::event::Event;
use nav_telemetry::kernel::identity::EventId;
use nav_telemetry::kernel::route::{Coordinate, LocationSample, Route, RouteProgress};
use nav_telemetry::kernel::state::DeviceOrientation;
use nav_telemetry::kernel::telemetry::event::{FeedbackSource, FeedbackType};
use nav_telemetry::kernel::transport::{TracingTransport, Transport};
use nav_telemetry::services::collector::client::CollectorClient;
use nav_telemetry::{TelemetryConfig, TelemetryReactor};

const METRES_PER_POINT: f64 = 111.0;
const SPEED_MPS: f64 = 13.9;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    info!("Navigation telemetry demo booting...");

    let config = TelemetryConfig::load()?;
    let route = synthetic_route("demo-route", 0, 16);

    let transport: Arc<dyn Transport> = match &config.collector {
        Some(collector) => Arc::new(CollectorClient::new(collector)),
        None => Arc::new(TracingTransport),
    };

    let mut reactor = TelemetryReactor::new(config.clone(), route.clone(), transport)
        .with_screen_capture(Box::new(FrameCapture::new(SolidFrame { width: 750, height: 1334 })));

    let (tx, rx) = mpsc::channel(100);
    let shutdown = CancellationToken::new();

    let token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    tokio::spawn(drive(route, tx, Duration::from_millis(config.cadence_ms)));

    let snapshot = reactor.run(rx, shutdown).await;
    info!("Session summary: {}", serde_json::to_string(&snapshot)?);

    if config.collector.is_some() {
        // Uploads run on spawned tasks; give the last batch a moment.
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    Ok(())
}

/// Straight line north from Berlin's Alexanderplatz, one point per ~111 m.
fn synthetic_route(request_id: &str, start: usize, points: usize) -> Route {
    let geometry: Vec<Coordinate> = (start..start + points)
        .map(|i| Coordinate::new(52.5219 + i as f64 * 0.001, 13.4132))
        .collect();
    let distance = (points.saturating_sub(1)) as f64 * METRES_PER_POINT;
    Route::new(request_id, geometry, distance, distance / SPEED_MPS)
}

fn progress_at(route: &Route, index: usize) -> RouteProgress {
    let last = route.geometry.len().saturating_sub(1);
    let traveled = index as f64 * METRES_PER_POINT;
    let remaining = (route.distance - traveled).max(0.0);
    RouteProgress {
        route: route.clone(),
        leg_index: 0,
        user_has_arrived_at_waypoint: index >= last,
        distance_traveled: traveled,
        distance_remaining: remaining,
        duration_remaining: remaining / SPEED_MPS,
        location: LocationSample {
            speed: SPEED_MPS,
            horizontal_accuracy: 5.0,
            ..LocationSample::at(route.geometry[index.min(last)], chrono::Utc::now())
        },
    }
}

async fn drive(route: Route, tx: mpsc::Sender<Event>, step: Duration) {
    let mut current = route;
    let mut index = 0;
    let mut rerouted = false;
    let report_id = EventId::new();

    loop {
        let progress = progress_at(&current, index);
        let arrived = progress.user_has_arrived_at_waypoint;
        if tx.send(Event::Progress(progress)).await.is_err() {
            return;
        }

        let scripted = match (index, rerouted) {
            (3, false) => Some(Event::Feedback {
                id: Some(report_id),
                feedback_type: FeedbackType::ConfusingInstruction,
                description: Some("Lane guidance was unclear".to_string()),
            }),
            (4, false) => Some(Event::UpdateFeedback {
                id: report_id,
                feedback_type: FeedbackType::ConfusingInstruction,
                source: FeedbackSource::User,
                description: Some("Lane guidance was unclear at the junction".to_string()),
            }),
            (5, false) => Some(Event::Orientation(DeviceOrientation::Landscape)),
            (8, false) => {
                rerouted = true;
                current = synthetic_route("demo-reroute", 8, 8);
                index = 0;
                Some(Event::Reroute {
                    route: current.clone(),
                    proactive: false,
                })
            }
            _ => None,
        };
        if let Some(event) = scripted {
            if tx.send(event).await.is_err() {
                return;
            }
        }

        if arrived {
            break;
        }
        index += 1;
        tokio::time::sleep(step).await;
    }

    let _ = tx.send(Event::Terminate).await;
}
