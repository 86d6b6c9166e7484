//! Configuration command handlers

use tauri::State;
use tracing::{error, info};

use crate::core::config::AppConfig;
use crate::AppState;

/// Get current application configuration
#[tauri::command]
pub async fn get_config(state: State<'_, AppState>) -> Result<AppConfig, String> {
    let config = state.config.read().await;
    Ok(config.clone())
}

/// Update application configuration
#[tauri::command]
pub async fn update_config(
    state: State<'_, AppState>,
    new_config: AppConfig,
) -> Result<(), String> {
    info!("⚙️ Updating application configuration");

    match state.update_config(new_config).await {
        Ok(()) => {
            info!("✅ Configuration updated successfully");
            Ok(())
        }
        Err(e) => {
            error!("❌ Failed to update configuration: {}", e);
            Err(e.to_string())
        }
    }
}

/// Reset configuration to defaults
#[tauri::command]
pub async fn reset_config(state: State<'_, AppState>) -> Result<AppConfig, String> {
    info!("🔄 Resetting configuration to defaults");

    state.reset_config().await.map_err(|e| {
        error!("❌ Failed to reset configuration: {}", e);
        e.to_string()
    })
}
