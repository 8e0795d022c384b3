#![no_main]
use std::sync::Arc;

use bascula_core::mocks::{MemoryLink, ScriptedScale};
use bascula_core::{Firmware, FirmwareCfg, MemoryStore};
use bascula_traits::clock::test_clock::TestClock;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary host bytes must only ever produce well-formed reply lines.
    let mut link = MemoryLink::new();
    link.push_input(&String::from_utf8_lossy(data));
    let clock = Arc::new(TestClock::new());
    let Ok(mut fw) = Firmware::new(
        ScriptedScale::from_samples([1_000, 1_400, 2_000, 2_600]),
        link,
        MemoryStore::new(),
        FirmwareCfg::default(),
        Some(clock),
    ) else {
        return;
    };
    if fw.boot().is_err() {
        return;
    }
    for _ in 0..8 {
        if fw.cycle().is_err() {
            return;
        }
    }
    for line in fw.link().output() {
        let known = line.starts_with("HELLO:")
            || line.starts_with("G:")
            || line == "ACK:T"
            || line.starts_with("ACK:C:")
            || line.starts_with("ERR:");
        assert!(known, "unexpected line {line:?}");
        assert!(!line.contains('\n'));
    }
});
