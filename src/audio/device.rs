//! Capture-device selection using cpal
//!
//! Loopscribe records what the machine is playing, so the preferred capture
//! endpoint is the default *output* device opened in loopback mode (shared
//! mix format). Hosts without loopback support fall back to the default
//! input device.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::DeviceId;
use std::str::FromStr;

/// A capture endpoint together with the stream config to open it with
pub struct CaptureEndpoint {
    pub device: cpal::Device,
    pub config: cpal::SupportedStreamConfig,
    /// True when this is an output endpoint captured in loopback mode
    pub loopback: bool,
}

/// Get the display name for a device
///
/// Uses `description()` as the primary method (cpal 0.17+), with `name()` as
/// fallback for edge cases where description isn't available.
pub fn get_device_display_name(device: &cpal::Device) -> String {
    device
        .description()
        .map(|desc| desc.name().to_string())
        .unwrap_or_else(|_| {
            #[allow(deprecated)]
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        })
}

/// Find a device by its stable ID
///
/// Uses cpal's DeviceId for reliable device lookup across restarts.
fn find_device_by_id(id_str: &str) -> Option<cpal::Device> {
    let host = cpal::default_host();
    let device_id = DeviceId::from_str(id_str).ok()?;
    host.device_by_id(&device_id)
}

/// Stream config for a device, trying the output (loopback) shape first.
fn endpoint_config(device: &cpal::Device) -> Option<(cpal::SupportedStreamConfig, bool)> {
    if let Ok(config) = device.default_output_config() {
        return Some((config, true));
    }
    device.default_input_config().ok().map(|c| (c, false))
}

/// Pick the capture endpoint to record from.
///
/// If a device ID is configured and found, that device is used. Otherwise
/// the default output endpoint (loopback) is preferred, with the default
/// input device as the last resort.
pub fn capture_endpoint(device_id: Option<&str>, prefer_loopback: bool) -> Option<CaptureEndpoint> {
    let host = cpal::default_host();
    tracing::debug!("CPAL host: {}", host.id().name());

    if let Some(id) = device_id {
        if let Some(device) = find_device_by_id(id) {
            let name = get_device_display_name(&device);
            if let Some((config, loopback)) = endpoint_config(&device) {
                tracing::info!("Using configured capture device: {}", name);
                return Some(CaptureEndpoint {
                    device,
                    config,
                    loopback,
                });
            }
            tracing::warn!("Configured device '{}' has no usable stream config", name);
        } else {
            tracing::warn!(
                "Configured capture device '{}' not found, falling back to default",
                id
            );
        }
    }

    if prefer_loopback {
        if let Some(device) = host.default_output_device() {
            if let Ok(config) = device.default_output_config() {
                tracing::info!(
                    "Using default output endpoint (loopback): '{}', {}Hz, {}ch, format={:?}",
                    get_device_display_name(&device),
                    config.sample_rate(),
                    config.channels(),
                    config.sample_format()
                );
                return Some(CaptureEndpoint {
                    device,
                    config,
                    loopback: true,
                });
            }
        }
        tracing::warn!("No loopback-capable output endpoint, trying default input device");
    }

    let device = host.default_input_device()?;
    let config = device.default_input_config().ok()?;
    tracing::info!(
        "Using default input device: '{}', {}Hz, {}ch, format={:?}",
        get_device_display_name(&device),
        config.sample_rate(),
        config.channels(),
        config.sample_format()
    );
    Some(CaptureEndpoint {
        device,
        config,
        loopback: false,
    })
}
