//! Host sessions driven through `Firmware::cycle` with scripted peripherals.

use std::sync::Arc;
use std::time::Duration;

use bascula_core::mocks::{MemoryLink, ScriptedScale};
use bascula_core::{
    CalibrationState, FileStore, Firmware, FirmwareCfg, KEY_SCALE_FACTOR, KEY_TARE_OFFSET,
    MemoryStore,
};
use bascula_traits::Storage;
use bascula_traits::clock::test_clock::TestClock;
use rstest::rstest;

type MemFirmware = Firmware<ScriptedScale, MemoryLink, MemoryStore>;

fn firmware_with(scale: ScriptedScale, store: MemoryStore) -> (MemFirmware, TestClock) {
    let clock = TestClock::new();
    let fw = Firmware::new(
        scale,
        MemoryLink::new(),
        store,
        FirmwareCfg::default(),
        Some(Arc::new(clock.clone())),
    )
    .unwrap();
    (fw, clock)
}

/// Send `input`, run one cycle and return everything written after the frame.
fn exchange<St: Storage>(
    fw: &mut Firmware<ScriptedScale, MemoryLink, St>,
    clock: &TestClock,
    input: &str,
) -> Vec<String> {
    fw.link_mut().push_input(input);
    fw.cycle().unwrap();
    clock.advance(fw.period());
    let mut out = fw.link_mut().take_output();
    assert!(out[0].starts_with("G:"), "frame first: {out:?}");
    out.remove(0);
    out
}

#[test]
fn tare_then_calibrate_persists_matching_factor() {
    let (mut fw, clock) = firmware_with(ScriptedScale::constant(1_000), MemoryStore::new());
    assert_eq!(exchange(&mut fw, &clock, "T\n"), vec!["ACK:T"]);
    assert_eq!(fw.calibration().tare_offset, 1_000);

    fw.scale_mut().set_constant(2_500);
    let out = exchange(&mut fw, &clock, "C:500\n");
    assert_eq!(out, vec!["ACK:C:0.33333334"]);

    let stored = fw.store().get_f32(KEY_SCALE_FACTOR).unwrap().unwrap();
    assert_eq!(stored, fw.calibration().scale_factor);
    assert_eq!(format!("ACK:C:{stored:.8}"), out[0]);
    assert_eq!(fw.store().get_i32(KEY_TARE_OFFSET).unwrap(), Some(1_000));

    // window now holds 1000, 2500, 2500: median 2500 -> 500 g, smoother reseeded
    fw.cycle().unwrap();
    assert_eq!(fw.link_mut().take_output(), vec!["G:500.00,S:0"]);
}

#[test]
fn calibrate_500g_at_mean_1500_gives_one_third() {
    let (mut fw, clock) = firmware_with(ScriptedScale::constant(1_500), MemoryStore::new());
    assert_eq!(
        exchange(&mut fw, &clock, "c:500\r\n"),
        vec!["ACK:C:0.33333334"]
    );
    let cal = fw.calibration();
    assert!((cal.scale_factor - 1.0 / 3.0).abs() < 1e-7);
    assert!((cal.raw_to_grams(1_500) - 500.0).abs() < 1e-3);
}

#[rstest]
#[case("C:0\n")]
#[case("C:-5\n")]
#[case("C:abc\n")]
#[case("C:\n")]
#[case("C:inf\n")]
fn invalid_weights_are_rejected_without_side_effects(#[case] line: &str) {
    let (mut fw, clock) = firmware_with(ScriptedScale::constant(1_500), MemoryStore::new());
    let reads_before = fw.scale_mut().reads();
    assert_eq!(exchange(&mut fw, &clock, line), vec!["ERR:CAL:weight"]);
    // only the cycle's own sample was taken
    assert_eq!(fw.scale_mut().reads(), reads_before + 1);
    assert_eq!(fw.calibration(), CalibrationState::default());
    assert_eq!(fw.store().get_f32(KEY_SCALE_FACTOR).unwrap(), None);
}

#[test]
fn zero_net_is_rejected_and_state_kept() {
    let (mut fw, clock) = firmware_with(ScriptedScale::constant(7_000), MemoryStore::new());
    assert_eq!(exchange(&mut fw, &clock, "T\n"), vec!["ACK:T"]);
    assert_eq!(exchange(&mut fw, &clock, "C:500\n"), vec!["ERR:CAL:zero"]);
    assert_eq!(fw.calibration().scale_factor, 1.0);
    assert_eq!(fw.store().get_f32(KEY_SCALE_FACTOR).unwrap(), None);
}

#[test]
fn sensor_failure_during_tare_reports_sensor_error() {
    let mut scale = ScriptedScale::constant(100);
    scale.push(100);
    scale.push_error("hx711 data-ready timeout");
    scale.push(100);
    let (mut fw, clock) = firmware_with(scale, MemoryStore::new());
    assert_eq!(exchange(&mut fw, &clock, "T\n"), vec!["ERR:SENSOR"]);
    assert_eq!(fw.calibration().tare_offset, 0);
}

#[test]
fn store_write_failure_reports_nvs_error() {
    let store = MemoryStore::new().with_failing_writes(true);
    let (mut fw, clock) = firmware_with(ScriptedScale::constant(1_500), store);
    assert_eq!(exchange(&mut fw, &clock, "T\n"), vec!["ERR:NVS"]);
    assert_eq!(exchange(&mut fw, &clock, "C:500\n"), vec!["ERR:NVS"]);
    assert_eq!(fw.calibration(), CalibrationState::default());
}

#[test]
fn overlong_line_yields_exactly_one_cmdlen() {
    let (mut fw, clock) = firmware_with(ScriptedScale::constant(0), MemoryStore::new());
    let line = format!("C:{}\n", "9".repeat(79));
    assert_eq!(line.trim_end().len(), 81);
    let out = exchange(&mut fw, &clock, &line);
    assert_eq!(out, vec!["ERR:CMDLEN"]);
    assert_eq!(fw.calibration(), CalibrationState::default());
    // buffer is clean for the next line
    assert_eq!(exchange(&mut fw, &clock, "T\n"), vec!["ACK:T"]);
}

#[test]
fn bytes_split_across_cycles_form_one_command() {
    let (mut fw, clock) = firmware_with(ScriptedScale::constant(0), MemoryStore::new());
    assert!(exchange(&mut fw, &clock, "X").is_empty());
    assert_eq!(exchange(&mut fw, &clock, "YZ\n"), vec!["ERR:UNKNOWN_CMD"]);
}

#[test]
fn stable_flag_follows_quiet_period() {
    let (mut fw, clock) = firmware_with(ScriptedScale::constant(400), MemoryStore::new());
    let mut flags = Vec::new();
    for _ in 0..40 {
        flags.push(fw.cycle().unwrap().stable);
        clock.advance(Duration::from_millis(20));
    }
    // 700 ms at 20 ms per cycle: stable from the 36th frame (t = 700 ms)
    assert!(flags[..35].iter().all(|s| !s));
    assert!(flags[35..].iter().all(|s| *s));

    // a 50 g step clears it once the median window has flipped (8 of 15)
    fw.scale_mut().set_constant(450);
    for _ in 0..7 {
        assert!(fw.cycle().unwrap().stable);
    }
    fw.cycle().unwrap();
    assert!(!fw.last_frame().stable);
}

#[test]
fn file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nvs.toml");
    let clock = TestClock::new();

    let mut fw = Firmware::new(
        ScriptedScale::constant(1_500),
        MemoryLink::new(),
        FileStore::open(&path).unwrap(),
        FirmwareCfg::default(),
        Some(Arc::new(clock.clone())),
    )
    .unwrap();
    assert_eq!(exchange(&mut fw, &clock, "C:750\n"), vec!["ACK:C:0.50000000"]);
    drop(fw);

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("[bascula]"), "{text}");

    let store = FileStore::open(&path).unwrap();
    assert_eq!(store.get_f32(KEY_SCALE_FACTOR).unwrap(), Some(0.5));
    let fw = Firmware::new(
        ScriptedScale::constant(0),
        MemoryLink::new(),
        store,
        FirmwareCfg::default(),
        None,
    )
    .unwrap();
    assert_eq!(fw.calibration().scale_factor, 0.5);
}
