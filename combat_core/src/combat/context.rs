//! CombatContext - explicit replacement for global managers
//!
//! Random source, clock, tunables, hooks and log sinks are threaded through
//! every pipeline call instead of living in singletons.

use super::hooks::{CombatScript, KillRewarder, ProcEvent};
use super::log::{CombatLog, CombatLogEntry, CombatLogSink};
use crate::config::CombatConstants;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub struct CombatContext {
    pub constants: CombatConstants,
    pub rng: Box<dyn RngCore>,
    /// World time in milliseconds
    pub now: u64,
    pub scripts: Vec<Box<dyn CombatScript>>,
    pub rewards: Option<Box<dyn KillRewarder>>,
    pub log: CombatLog,
    pub observers: Vec<Box<dyn CombatLogSink>>,
}

impl std::fmt::Debug for CombatContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombatContext")
            .field("now", &self.now)
            .field("scripts", &self.scripts)
            .field("rewards", &self.rewards)
            .field("log", &self.log.len())
            .finish_non_exhaustive()
    }
}

impl CombatContext {
    /// Context with a seeded ChaCha RNG for reproducible encounters
    pub fn new(constants: CombatConstants, seed: u64) -> Self {
        Self::with_rng(constants, Box::new(ChaCha8Rng::seed_from_u64(seed)))
    }

    pub fn with_rng(constants: CombatConstants, rng: Box<dyn RngCore>) -> Self {
        CombatContext {
            constants,
            rng,
            now: 0,
            scripts: Vec::new(),
            rewards: None,
            log: CombatLog::new(),
            observers: Vec::new(),
        }
    }

    pub fn add_script(&mut self, script: Box<dyn CombatScript>) {
        self.scripts.push(script);
    }

    pub fn add_observer(&mut self, observer: Box<dyn CombatLogSink>) {
        self.observers.push(observer);
    }

    /// Uniform integer in `[0, 9999]`
    pub fn roll_basis_points(&mut self) -> i32 {
        self.rng.gen_range(0..10_000)
    }

    /// Uniform float in `[0, 1)`
    pub fn rand_norm(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }

    /// True with probability `pct` percent
    pub fn roll_chance(&mut self, pct: f32) -> bool {
        pct > 0.0 && pct > self.rand_norm() * 100.0
    }

    /// Uniform integer in `[min, max]`
    pub fn urand(&mut self, min: u32, max: u32) -> u32 {
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    /// Record an event in the log and fan it out to observers
    pub fn emit(&mut self, entry: CombatLogEntry) {
        for observer in self.observers.iter_mut() {
            observer.record(&entry);
        }
        self.log.record(&entry);
    }

    pub fn fire_proc(&mut self, event: ProcEvent) {
        for script in self.scripts.iter_mut() {
            script.on_proc(&event);
        }
    }
}
