//! Human-readable error descriptions and structured JSON error formatting.

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use bascula_core::error::{BuildError, FirmwareError};

    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingScale => {
                "What happened: No load cell was provided to the firmware.\nLikely causes: The HX711 failed to initialize or was not wired into the builder.\nHow to fix: Ensure the scale is created successfully and passed via with_scale(...).".to_string()
            }
            BuildError::MissingLink => {
                "What happened: No host link was provided to the firmware.\nLikely causes: The serial port or stdin/stdout channel failed to open.\nHow to fix: Check [serial].port / --port and permissions on the device.".to_string()
            }
            BuildError::MissingStorage => {
                "What happened: No calibration store was provided to the firmware.\nLikely causes: The store file could not be opened.\nHow to fix: Check [storage].path in the config.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/bascula.toml for a sample."
            ),
        };
    }

    if let Some(fe) = err.downcast_ref::<FirmwareError>() {
        return match fe {
            FirmwareError::Timeout => "What happened: Scale read timed out.\nLikely causes: HX711 not wired correctly, no power/ground, or timeout too low.\nHow to fix: Verify DT/SCK pins and power, and consider increasing hardware.sensor_read_timeout_ms in the config.".to_string(),
            FirmwareError::Link(msg) => format!(
                "What happened: The host link failed ({msg}).\nLikely causes: Serial adapter unplugged, host closed the pipe, or wrong port.\nHow to fix: Reconnect the host side and restart; check --port / [serial].port."
            ),
            FirmwareError::Storage(msg) => format!(
                "What happened: Calibration storage failed ({msg}).\nLikely causes: Read-only filesystem, full disk, or a hand-edited store file.\nHow to fix: Check [storage].path and its permissions; delete the file to reset calibration."
            ),
            FirmwareError::Hardware(msg) | FirmwareError::HardwareFault(msg) => format!(
                "What happened: Hardware error ({msg}).\nLikely causes: GPIO busy or not permitted, or a wiring fault.\nHow to fix: Check [pins] and GPIO permissions, then rerun with --log-level=debug."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = format!("{err:#}").to_ascii_lowercase();

    if lower.contains("open hx711") {
        return "What happened: Failed to initialize the HX711 pins.\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO.".to_string();
    }

    if lower.contains("open serial port") {
        return format!(
            "What happened: Could not open the serial port.\nLikely causes: Wrong device path, device in use, or missing dialout permissions.\nHow to fix: Check --port / [serial].port and group membership. Original: {msg}"
        );
    }

    if lower.contains("invalid configuration")
        || lower.contains("parse config")
        || lower.contains("read config")
    {
        return format!(
            "What happened: Configuration is invalid or incomplete.\nLikely causes: Missing [pins] (hx711_dt, hx711_sck), a typo, or out-of-range values.\nHow to fix: Edit the TOML config and try again. Details: {err:#}"
        );
    }

    if lower.contains("store") {
        return format!(
            "What happened: The calibration store could not be read.\nLikely causes: The file is not valid TOML or holds wrong value types.\nHow to fix: Fix or delete [storage].path. Details: {err:#}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable process exit codes per error kind.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    use bascula_core::error::{BuildError, FirmwareError};
    if err.downcast_ref::<BuildError>().is_some() {
        return 2;
    }
    if let Some(fe) = err.downcast_ref::<FirmwareError>() {
        return match fe {
            FirmwareError::Link(_) => 3,
            FirmwareError::Timeout => 4,
            FirmwareError::Hardware(_) | FirmwareError::HardwareFault(_) => 5,
            FirmwareError::Storage(_) => 6,
        };
    }
    let lower = format!("{err:#}").to_ascii_lowercase();
    if lower.contains("invalid configuration")
        || lower.contains("parse config")
        || lower.contains("read config")
    {
        return 2;
    }
    1
}

/// Short machine-readable name of the error kind.
pub fn error_reason_name(err: &eyre::Report) -> &'static str {
    use bascula_core::error::{BuildError, FirmwareError};
    if err.downcast_ref::<BuildError>().is_some() {
        return "Config";
    }
    match err.downcast_ref::<FirmwareError>() {
        Some(FirmwareError::Link(_)) => "Link",
        Some(FirmwareError::Timeout) => "Timeout",
        Some(FirmwareError::Hardware(_) | FirmwareError::HardwareFault(_)) => "Hardware",
        Some(FirmwareError::Storage(_)) => "Storage",
        None if exit_code_for_error(err) == 2 => "Config",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    json!({
        "reason": error_reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
