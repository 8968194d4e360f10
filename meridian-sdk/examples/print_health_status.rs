//! Prints the health of a Meridian installation.
//!
//! Connects to the project manager configured in [`Services::default`]
//! (override the host with `MERIDIAN_HOST`), then prints the platform
//! version, the license status and the per-sensor and per-node health.

use meridian_sdk::{LicensePrivilege, Sdk, SdkOptions, SensorStatus, Services};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut services = Services::default();
    if let Ok(host) = std::env::var("MERIDIAN_HOST") {
        services.detection_merger = services.detection_merger.map(|s| s.with_host(host.clone()));
        services.point_aggregator = services.point_aggregator.map(|s| s.with_host(host.clone()));
        services.project_manager = services.project_manager.map(|s| s.with_host(host.clone()));
        services.notification = services.notification.map(|s| s.with_host(host.clone()));
    }

    let sdk = Sdk::connect(SdkOptions {
        services: Some(services),
        ..Default::default()
    })
    .await?;

    match sdk.version().await {
        Ok(version) => println!("Platform version: {version}"),
        Err(error) => eprintln!("Could not fetch version: {error}"),
    }

    let health = sdk.health_status().await?;

    println!();
    println!(
        "License level {} ({})",
        health.license_status.license_level, health.license_status.reason
    );
    if let Some(info) = &health.license_status.license_info {
        println!("  {} lidars allowed", info.lidar_count);
        for feature in &info.allowed_features {
            println!("  feature: {feature}");
        }
    }
    println!("Privileges:");
    for privilege in LicensePrivilege::ALL {
        println!(
            "  {:<16} {}",
            privilege.to_string(),
            if health.license_status.has_privilege(privilege) {
                "granted"
            } else {
                "-"
            }
        );
    }

    println!();
    println!("Sensors:");
    for sensor in &health.sensor_statuses {
        if sensor.is_unreachable() {
            println!("  {:<24} unreachable: {}", sensor.lidar_id, sensor.unreachable_reason);
            continue;
        }
        let statuses: Vec<String> = SensorStatus::ALL
            .iter()
            .filter(|status| sensor.has_status(**status))
            .map(|status| status.to_string())
            .collect();
        println!(
            "  {:<24} {:>6.1} Hz  {}",
            sensor.lidar_id,
            sensor.measured_frequency_hz,
            statuses.join(", ")
        );
    }

    println!();
    println!("Nodes:");
    for node in &health.service_statuses {
        println!("  {:<18} {:<24} {}", node.service.to_string(), node.node_id, node.status);
    }

    sdk.close().await;
    Ok(())
}
