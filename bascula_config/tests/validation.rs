use bascula_config::{load_file, load_toml};
use rstest::rstest;

const BASE: &str = r#"
[pins]
hx711_dt = 4
hx711_sck = 5
"#;

fn with_section(extra: &str) -> String {
    format!("{BASE}\n{extra}\n")
}

#[test]
fn accepts_fully_specified_config() {
    let toml = r#"
[pins]
hx711_dt = 4
hx711_sck = 5

[filter]
iir_alpha = 0.2
loop_hz = 50

[stability]
delta_g = 1.0
stable_ms = 700

[protocol]
cmd_max_len = 80
device_id = "ESP32-HX711"

[calibration]
samples = 20
settle_ms = 5

[hardware]
sensor_read_timeout_ms = 150
gain_pulses = 25

[serial]
port = "/dev/ttyAMA0"
baud = 115200

[storage]
path = "/var/lib/bascula/nvs.toml"

[logging]
level = "debug"
rotation = "daily"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.protocol.device_id, "ESP32-HX711");
    assert_eq!(cfg.serial.port.as_deref(), Some("/dev/ttyAMA0"));
}

#[rstest]
#[case("[filter]\niir_alpha = 0.0", "iir_alpha")]
#[case("[filter]\niir_alpha = 1.0", "iir_alpha")]
#[case("[filter]\nloop_hz = 0", "loop_hz must be > 0")]
#[case("[filter]\nloop_hz = 5000", "loop_hz must be <= 1000")]
#[case("[stability]\ndelta_g = -0.5", "delta_g")]
#[case("[stability]\nstable_ms = 600000", "stable_ms")]
#[case("[protocol]\ncmd_max_len = 0", "cmd_max_len")]
#[case("[protocol]\ndevice_id = \"\"", "device_id")]
#[case("[protocol]\ndevice_id = \"A:B\"", "device_id")]
#[case("[calibration]\nsamples = 0", "calibration.samples")]
#[case("[calibration]\nsettle_ms = 5000", "settle_ms")]
#[case("[hardware]\nsensor_read_timeout_ms = 0", "sensor_read_timeout_ms")]
#[case("[hardware]\ngain_pulses = 24", "gain_pulses")]
#[case("[serial]\nbaud = 0", "baud")]
#[case("[serial]\nport = \"\"", "serial.port")]
#[case("[storage]\npath = \"  \"", "storage.path")]
#[case("[logging]\nrotation = \"weekly\"", "rotation")]
fn rejects_out_of_range_values(#[case] section: &str, #[case] needle: &str) {
    let cfg = load_toml(&with_section(section)).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        format!("{err}").contains(needle),
        "error '{err}' should mention '{needle}'"
    );
}

#[test]
fn rejects_shared_clock_and_data_pin() {
    let cfg = load_toml("[pins]\nhx711_dt = 5\nhx711_sck = 5\n").expect("parse TOML");
    assert!(cfg.validate().is_err());
}

#[test]
fn load_file_reports_path_and_reason() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bascula.toml");
    std::fs::write(&path, with_section("[filter]\nloop_hz = 0")).unwrap();

    let err = load_file(&path).expect_err("invalid file");
    let chain = format!("{err:#}");
    assert!(chain.contains("invalid configuration"), "{chain}");
    assert!(chain.contains("loop_hz"), "{chain}");
}

#[test]
fn load_file_missing_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_file(&dir.path().join("nope.toml")).expect_err("missing file");
    assert!(format!("{err}").contains("read config"));
}

#[test]
fn shipped_sample_config_is_valid() {
    let cfg = bascula_config::load_toml(include_str!("../../etc/bascula.toml")).unwrap();
    cfg.validate().unwrap();
    assert_eq!(cfg.protocol.device_id, "RPI-HX711");
    assert_eq!(cfg.filter.loop_hz, 50);
}
