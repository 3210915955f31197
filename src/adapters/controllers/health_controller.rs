use axum::{extract::State, Json};
use serde::Serialize;
use sysinfo::System;
use tracing::info;

use crate::{
    adapters::state::AppState,
    domain::models::upload::{ALLOWED_MIME_TYPES, MAX_UPLOAD_SIZE},
};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uploads: UploadsInfo,
    #[serde(rename = "paymentsEnabled")]
    pub payments_enabled: bool,
    pub metrics: SystemMetrics,
}

#[derive(Debug, Serialize)]
pub struct UploadsInfo {
    pub enabled: bool,
    #[serde(rename = "maxSize")]
    pub max_size: u64,
    #[serde(rename = "allowedMimeTypes")]
    pub allowed_mime_types: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct SystemMetrics {
    #[serde(rename = "cpuUsagePercent")]
    pub cpu_usage_percent: f32,
    #[serde(rename = "memoryUsedBytes")]
    pub memory_used_bytes: u64,
    #[serde(rename = "memoryTotalBytes")]
    pub memory_total_bytes: u64,
    #[serde(rename = "memoryUsagePercent")]
    pub memory_usage_percent: f32,
}

pub struct HealthController;

impl HealthController {
    /// Health check endpoint, admin only
    /// GET /api/v1/health
    pub async fn health_check(State(app_state): State<AppState>) -> Json<HealthResponse> {
        info!("Health check requested");

        // only refresh what's reported
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let memory_used = sys.used_memory();
        let memory_total = sys.total_memory();
        let memory_usage_percent = if memory_total > 0 {
            (memory_used as f32 / memory_total as f32) * 100.0
        } else {
            0.0
        };

        Json(HealthResponse {
            status: "healthy".to_string(),
            uploads: UploadsInfo {
                enabled: app_state.uploads.is_enabled(),
                max_size: MAX_UPLOAD_SIZE,
                allowed_mime_types: ALLOWED_MIME_TYPES.to_vec(),
            },
            payments_enabled: app_state.payments.is_some(),
            metrics: SystemMetrics {
                cpu_usage_percent: sys.global_cpu_usage(),
                memory_used_bytes: memory_used,
                memory_total_bytes: memory_total,
                memory_usage_percent,
            },
        })
    }
}
