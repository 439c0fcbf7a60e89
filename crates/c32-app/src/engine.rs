//! Engine: one controller and one link driven by a single loop.
//!
//! Each iteration drains inbound requests, ticks the controller with the
//! link as monitoring sink, answers applied task commands, then sleeps
//! until the earliest task is due (clamped by the scheduler config).

use core::time::Duration;
use std::sync::atomic::{AtomicBool, Ordering};

use c32_blocks::FunctionFactory;
use c32_core::{Clock, StaticProbe};
use c32_link::{Link, LinkInbox, Transport};
use c32_runtime::Controller;
use tracing::info;

use crate::config::EngineConfig;
use crate::demo::{self, SineCircuit};
use crate::error::AppResult;

pub struct Engine<T: Transport> {
    controller: Controller,
    link: Link<T>,
}

impl<T: Transport> Engine<T> {
    /// Engine with the standard function catalog.
    pub fn new<C>(config: &EngineConfig, transport: T, clock: C) -> AppResult<Self>
    where
        C: Clock + Clone + 'static,
    {
        config.validate()?;
        let factory = c32_library::standard_factory()?;
        Ok(Self::with_factory(config, transport, clock, factory))
    }

    pub fn with_factory<C>(config: &EngineConfig, transport: T, clock: C, factory: FunctionFactory) -> Self
    where
        C: Clock + Clone + 'static,
    {
        let controller = Controller::new(
            Box::new(clock.clone()),
            Box::new(StaticProbe::new(config.system)),
            config.scheduler,
        );
        let link = Link::new(transport, factory, Box::new(clock), config.link);
        Self { controller, link }
    }

    /// Transport-side handle for inbound events. Available once.
    pub fn inbox(&mut self) -> Option<LinkInbox> {
        self.link.take_inbox()
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut Controller {
        &mut self.controller
    }

    pub fn link(&self) -> &Link<T> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut Link<T> {
        &mut self.link
    }

    /// Build and start the sine demo circuit.
    pub fn install_sine_demo(&mut self, interval_ms: u32) -> AppResult<SineCircuit> {
        demo::sine_circuit(&mut self.controller, self.link.factory(), interval_ms)
    }

    /// One loop iteration. Returns how long to sleep before the next.
    pub fn run_once(&mut self) -> Duration {
        self.link.process(&mut self.controller);
        let next = self.controller.tick(self.link.monitoring_sink());
        self.link.flush_acks(&mut self.controller);
        self.controller.sleep_duration(next)
    }

    /// Run until `stop` is set.
    pub fn run_until(&mut self, stop: &AtomicBool) {
        info!("engine running");
        while !stop.load(Ordering::Relaxed) {
            let sleep = self.run_once();
            std::thread::sleep(sleep);
        }
        self.controller.log_summary();
        info!(ticks = self.controller.tick_count(), "engine stopped");
    }
}
