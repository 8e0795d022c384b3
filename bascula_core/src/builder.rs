//! Type-state builder for the boxed `Firmware`.
//!
//! The builder enforces at compile time that Scale, HostLink and Storage are
//! provided before `build()` is available. `try_build()` is always available
//! for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use bascula_traits::clock::Clock;
use bascula_traits::{HostLink, Scale, Storage};

use crate::config::*;
use crate::error::{BuildError, Result};
use crate::firmware::Firmware;

/// `Firmware` over trait objects, as assembled by the binary.
pub type DynFirmware = Firmware<Box<dyn Scale>, Box<dyn HostLink>, Box<dyn Storage>>;

impl DynFirmware {
    /// Start building a boxed firmware instance.
    pub fn builder() -> FirmwareBuilder<Missing, Missing, Missing> {
        FirmwareBuilder::default()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `DynFirmware`. All fields are validated on `build()`.
pub struct FirmwareBuilder<S, L, St> {
    scale: Option<Box<dyn Scale>>,
    link: Option<Box<dyn HostLink>>,
    store: Option<Box<dyn Storage>>,
    filter: Option<FilterCfg>,
    stability: Option<StabilityCfg>,
    protocol: Option<ProtocolCfg>,
    calibration: Option<CalibrationCfg>,
    timeouts: Option<Timeouts>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    _s: PhantomData<S>,
    _l: PhantomData<L>,
    _st: PhantomData<St>,
}

impl Default for FirmwareBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            scale: None,
            link: None,
            store: None,
            filter: None,
            stability: None,
            protocol: None,
            calibration: None,
            timeouts: None,
            clock: None,
            _s: PhantomData,
            _l: PhantomData,
            _st: PhantomData,
        }
    }
}

impl<S, L, St> FirmwareBuilder<S, L, St> {
    /// Fallible build available in any type-state; returns a typed error for
    /// missing pieces.
    pub fn try_build(self) -> Result<DynFirmware> {
        let scale = self
            .scale
            .ok_or_else(|| eyre::Report::new(BuildError::MissingScale))?;
        let link = self
            .link
            .ok_or_else(|| eyre::Report::new(BuildError::MissingLink))?;
        let store = self
            .store
            .ok_or_else(|| eyre::Report::new(BuildError::MissingStorage))?;
        let cfg = FirmwareCfg {
            filter: self.filter.unwrap_or_default(),
            stability: self.stability.unwrap_or_default(),
            protocol: self.protocol.unwrap_or_default(),
            calibration: self.calibration.unwrap_or_default(),
            timeouts: self.timeouts.unwrap_or_default(),
        };
        Firmware::new(scale, link, store, cfg, self.clock)
    }

    /// Change the type-state markers, keeping every field.
    fn retag<S2, L2, St2>(self) -> FirmwareBuilder<S2, L2, St2> {
        FirmwareBuilder {
            scale: self.scale,
            link: self.link,
            store: self.store,
            filter: self.filter,
            stability: self.stability,
            protocol: self.protocol,
            calibration: self.calibration,
            timeouts: self.timeouts,
            clock: self.clock,
            _s: PhantomData,
            _l: PhantomData,
            _st: PhantomData,
        }
    }
}

/// Chainable setters that do not affect type-state.
impl<S, L, St> FirmwareBuilder<S, L, St> {
    /// Apply a complete runtime configuration.
    pub fn with_config(mut self, cfg: FirmwareCfg) -> Self {
        self.filter = Some(cfg.filter);
        self.stability = Some(cfg.stability);
        self.protocol = Some(cfg.protocol);
        self.calibration = Some(cfg.calibration);
        self.timeouts = Some(cfg.timeouts);
        self
    }
    pub fn with_filter(mut self, filter: FilterCfg) -> Self {
        self.filter = Some(filter);
        self
    }
    pub fn with_stability(mut self, stability: StabilityCfg) -> Self {
        self.stability = Some(stability);
        self
    }
    pub fn with_protocol(mut self, protocol: ProtocolCfg) -> Self {
        self.protocol = Some(protocol);
        self
    }
    pub fn with_calibration(mut self, calibration: CalibrationCfg) -> Self {
        self.calibration = Some(calibration);
        self
    }
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = Some(timeouts);
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock`
    /// when not provided.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<L, St> FirmwareBuilder<Missing, L, St> {
    pub fn with_scale(mut self, scale: impl Scale + 'static) -> FirmwareBuilder<Set, L, St> {
        self.scale = Some(Box::new(scale));
        self.retag()
    }
}

impl<S, St> FirmwareBuilder<S, Missing, St> {
    pub fn with_link(mut self, link: impl HostLink + 'static) -> FirmwareBuilder<S, Set, St> {
        self.link = Some(Box::new(link));
        self.retag()
    }
}

impl<S, L> FirmwareBuilder<S, L, Missing> {
    pub fn with_store(mut self, store: impl Storage + 'static) -> FirmwareBuilder<S, L, Set> {
        self.store = Some(Box::new(store));
        self.retag()
    }
}

impl FirmwareBuilder<Set, Set, Set> {
    /// Validate and build. Only available once Scale, HostLink and Storage
    /// are set.
    pub fn build(self) -> Result<DynFirmware> {
        self.try_build()
    }
}
