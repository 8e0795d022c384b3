//! Real-time scheduling helpers (Linux SCHED_FIFO + mlockall).
//!
//! Everything here is best effort: a failure is logged and the loop runs
//! with normal scheduling.

use crate::cli::RtLock;

#[cfg(target_os = "linux")]
pub fn setup_rt_once(rt: bool, prio: Option<i32>, lock: RtLock) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    if !rt {
        return;
    }
    RT_ONCE.get_or_init(|| {
        match lock_memory(lock) {
            Ok(()) => tracing::info!(mode = ?lock, "rt: memory lock applied"),
            Err(e) => tracing::warn!(mode = ?lock, error = %e, "rt: mlockall failed"),
        }
        match set_fifo_priority(prio) {
            Ok(applied) => tracing::info!(priority = applied, "rt: SCHED_FIFO enabled"),
            Err(e) => tracing::warn!(
                requested = ?prio,
                error = %e,
                "rt: sched_setscheduler failed; needs CAP_SYS_NICE or root"
            ),
        }
    });
}

#[cfg(target_os = "linux")]
fn lock_memory(lock: RtLock) -> std::io::Result<()> {
    use libc::{MCL_CURRENT, MCL_FUTURE, mlockall};

    fn call(flags: libc::c_int) -> std::io::Result<()> {
        // SAFETY: mlockall only takes flags and touches no Rust-managed memory.
        let rc = unsafe { mlockall(flags) };
        if rc == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error())
        }
    }

    match lock {
        RtLock::None => Ok(()),
        RtLock::Current => call(MCL_CURRENT),
        // future pages may exceed `ulimit -l`; settle for current ones then
        RtLock::All => call(MCL_CURRENT | MCL_FUTURE).or_else(|e| {
            tracing::debug!(error = %e, "mlockall(current|future) refused, retrying current");
            call(MCL_CURRENT)
        }),
    }
}

/// Apply SCHED_FIFO at `prio` (default: system max), clamped to the valid
/// range. Returns the priority actually requested.
#[cfg(target_os = "linux")]
fn set_fifo_priority(prio: Option<i32>) -> std::io::Result<i32> {
    use libc::{SCHED_FIFO, sched_get_priority_max, sched_get_priority_min, sched_param};

    // SAFETY: plain queries without pointers.
    let (min, max) = unsafe {
        (
            sched_get_priority_min(SCHED_FIFO),
            sched_get_priority_max(SCHED_FIFO),
        )
    };
    let (min, max) = if min < 0 || max < 0 { (1, 99) } else { (min, max) };
    let value = prio.unwrap_or(max).clamp(min, max);
    let param = sched_param {
        sched_priority: value,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling process.
    let rc = unsafe { libc::sched_setscheduler(0, SCHED_FIFO, &param) };
    if rc == 0 {
        Ok(value)
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(target_os = "linux"))]
pub fn setup_rt_once(rt: bool, _prio: Option<i32>, _lock: RtLock) {
    if rt {
        tracing::warn!("rt: real-time mode is only supported on Linux; ignoring --rt");
    }
}
