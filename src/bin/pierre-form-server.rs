// ABOUTME: Server binary for real-time exercise form analysis
// ABOUTME: Loads configuration, wires the pose model and serves REST and WebSocket routes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Pierre Form Server Binary
//!
//! Starts the form analysis server with streaming sessions on `/ws/form`
//! and the REST fallback under `/api/form`.

use anyhow::Result;
use clap::Parser;
use pierre_form_server::{
    config::{PoseModelConfig, ServerConfig},
    constants::routes,
    logging,
    server::{FormServer, ServerResources},
};
use pierre_intelligence::IdealRangeTable;
use pierre_providers::{
    initialize_shared_client, shared_client, CircuitBreakerConfig, FallbackPoseEstimator,
    HttpPoseEstimator, PoseEstimator, UnconfiguredPoseEstimator,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "pierre-form-server")]
#[command(about = "Pierre Form Server - Real-time exercise form analysis")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// Ideal-range YAML replacing the embedded table
    #[arg(long)]
    ideal_ranges: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }
    if let Some(path) = args.ideal_ranges {
        config.analysis.ideal_ranges_path = Some(path);
    }

    logging::init_from_env()?;
    info!("Starting Pierre Form Server");
    info!("{}", config.summary());

    let table = IdealRangeTable::load_or_default(config.analysis.ideal_ranges_path.as_deref())?;
    info!(
        exercises = ?table.exercises().collect::<Vec<_>>(),
        "Ideal-range table loaded"
    );

    let pose = build_pose_estimator(&config.pose_model);
    info!(pose_model = pose.name(), "Pose model configured");

    let http_port = config.http_port;
    let resources = Arc::new(ServerResources::new(config, Arc::new(table), pose));
    let server = FormServer::new(resources);

    display_available_endpoints(http_port);

    if let Err(e) = server.run(http_port).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}

/// Pose model chain: HTTP primary with an optional HTTP fallback
fn build_pose_estimator(config: &PoseModelConfig) -> Arc<dyn PoseEstimator> {
    let Some(url) = config.url.as_deref() else {
        warn!("POSE_MODEL_URL not set, image frames will be rejected; landmark frames still work");
        return Arc::new(UnconfiguredPoseEstimator);
    };

    initialize_shared_client(config.timeout_ms, config.connect_timeout_ms);
    let breaker = CircuitBreakerConfig::new(
        config.failure_threshold,
        Duration::from_secs(config.recovery_timeout_secs),
        1,
    );

    let primary: Arc<dyn PoseEstimator> = Arc::new(HttpPoseEstimator::new(
        "primary",
        url,
        shared_client().clone(),
        breaker.clone(),
    ));
    let fallback = config.fallback_url.as_deref().map(|fallback_url| {
        Arc::new(HttpPoseEstimator::new(
            "fallback",
            fallback_url,
            shared_client().clone(),
            breaker.clone(),
        )) as Arc<dyn PoseEstimator>
    });

    Arc::new(FallbackPoseEstimator::new(primary, fallback))
}

/// Display all available endpoints
fn display_available_endpoints(port: u16) {
    let host = format!("http://localhost:{port}");
    info!("=== Available Endpoints ===");
    info!("  Streaming:    ws://localhost:{port}{}", routes::FORM_WEBSOCKET);
    info!("  Analyze:      POST {host}{}", routes::FORM_ANALYZE);
    info!("  Camera check: POST {host}{}", routes::FORM_CAMERA_CHECK);
    info!("  Exercises:    GET  {host}{}", routes::FORM_EXERCISES);
    info!("  Health:       GET  {host}{}", routes::HEALTH);
}
