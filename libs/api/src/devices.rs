use crate::ApiError;

/// Parse a device list such as `"IMU1-IMU2-IMU3"`, `"IMU1,IMU2"` or any mix.
///
/// Splits on commas first, then on hyphens; tokens are trimmed, empty ones
/// dropped, order preserved. An empty result is a `Config` error.
pub fn parse_device_list(raw: &str) -> Result<Vec<String>, ApiError> {
    let devices: Vec<String> = raw
        .split(',')
        .flat_map(|chunk| chunk.split('-'))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();

    if devices.is_empty() {
        return Err(ApiError::config(format!("empty or invalid device list: {raw:?}")));
    }
    Ok(devices)
}
