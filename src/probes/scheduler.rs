//! Fixed-cadence, non-blocking sampling of the probe bus.
//!
//! Each cycle collects the conversion requested by the previous cycle and
//! then requests the next one without waiting for it, so the value stored
//! at cycle N was measured in response to the request made at cycle N-1.

use crate::probes::bus::BusDriver;
use crate::probes::data::Reading;
use crate::probes::registry::ProbeRegistry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Where the scheduler is between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    /// No conversion is in flight; the next due tick only requests one.
    Idle,
    /// A conversion was requested and will be collected on the next due tick.
    Collecting { requested_at_ms: u32 },
}

/// What a call to [`SamplingScheduler::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The interval has not elapsed yet; nothing touched.
    Waiting,
    /// A cycle ran.
    Cycle(CycleReport),
}

/// Counts from one sampling cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Probes whose slot was updated
    pub collected: usize,
    /// Probes that failed to report and kept their previous reading
    pub failed: usize,
    /// Whether the next conversion request was accepted by the bus
    pub requested: bool,
}

/// Timer-driven state machine that owns the bus.
pub struct SamplingScheduler<B> {
    bus: B,
    registry: Arc<ProbeRegistry>,
    interval_ms: u32,
    state: SamplerState,
    last_cycle_start_ms: Option<u32>,
}

impl<B: BusDriver> SamplingScheduler<B> {
    /// Start idle; the first tick requests a conversion.
    pub fn new(bus: B, registry: Arc<ProbeRegistry>, interval_ms: u32) -> Self {
        Self {
            bus,
            registry,
            interval_ms,
            state: SamplerState::Idle,
            last_cycle_start_ms: None,
        }
    }

    /// Current state of the conversion cycle.
    pub fn state(&self) -> SamplerState {
        self.state
    }

    /// Cadence between cycles, in milliseconds.
    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Registry the scheduler writes readings into.
    pub fn registry(&self) -> &Arc<ProbeRegistry> {
        &self.registry
    }

    /// Mutable access to the owned bus.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Advance the state machine to `now_ms` (a wrapping millisecond clock).
    ///
    /// A cycle runs on the first tick, then whenever strictly more than the
    /// interval has elapsed since the last cycle started. Never waits on
    /// the bus.
    pub fn tick(&mut self, now_ms: u32) -> TickOutcome {
        if let Some(last) = self.last_cycle_start_ms {
            // Unsigned difference stays correct across one counter wrap.
            if now_ms.wrapping_sub(last) <= self.interval_ms {
                return TickOutcome::Waiting;
            }
        }

        let mut report = CycleReport::default();
        if let SamplerState::Collecting { .. } = self.state {
            (report.collected, report.failed) = self.collect(now_ms);
        }

        self.state = match self.bus.request_conversion(true) {
            Ok(()) => {
                report.requested = true;
                SamplerState::Collecting {
                    requested_at_ms: now_ms,
                }
            }
            Err(err) => {
                error!(error = %err, "conversion request failed");
                SamplerState::Idle
            }
        };
        self.last_cycle_start_ms = Some(now_ms);

        debug!(
            now_ms,
            collected = report.collected,
            failed = report.failed,
            requested = report.requested,
            "sampling cycle complete"
        );
        TickOutcome::Cycle(report)
    }

    /// Run one blocking request-and-collect cycle.
    ///
    /// Only for one-shot use outside the cooperative loop: the call stalls
    /// for the full conversion time.
    pub fn sample_blocking(&mut self, now_ms: u32) -> CycleReport {
        let mut report = CycleReport::default();
        match self.bus.request_conversion(false) {
            Ok(()) => {
                report.requested = true;
                (report.collected, report.failed) = self.collect(now_ms);
            }
            Err(err) => error!(error = %err, "conversion request failed"),
        }
        self.state = SamplerState::Idle;
        self.last_cycle_start_ms = Some(now_ms);
        report
    }

    /// Read every probe's last conversion into the store. A failing probe
    /// keeps its previous reading and does not stop the others.
    fn collect(&mut self, now_ms: u32) -> (usize, usize) {
        let registry = Arc::clone(&self.registry);
        let (mut collected, mut failed) = (0, 0);

        for probe in registry.directory().iter() {
            let celsius = match self.bus.temp_celsius(&probe.id) {
                Ok(celsius) if celsius.is_finite() => celsius,
                Ok(celsius) => {
                    warn!(probe = %probe.id, celsius, "probe returned a non-finite temperature");
                    failed += 1;
                    continue;
                }
                Err(err) => {
                    warn!(probe = %probe.id, error = %err, "conversion failed, keeping previous reading");
                    failed += 1;
                    continue;
                }
            };

            let reading = Reading::from_celsius(celsius, probe.resolution_bits, now_ms);
            match registry.store().update(probe.index, reading) {
                Ok(()) => collected += 1,
                Err(err) => {
                    error!(error = %err, "reading store rejected update");
                    failed += 1;
                }
            }
        }
        (collected, failed)
    }
}

impl<B: BusDriver + 'static> SamplingScheduler<B> {
    /// Drive `tick` forever from a tokio interval.
    pub async fn run(mut self, clock: MonotonicClock, poll: Duration) {
        let mut ticker = tokio::time::interval(poll);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.tick(clock.now_ms());
        }
    }
}

/// Milliseconds since construction, truncated to 32 bits (wraps after ~49.7 days).
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed milliseconds, wrapping at `u32::MAX`.
    pub fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}
