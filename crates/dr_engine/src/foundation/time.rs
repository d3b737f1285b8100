//! Simulation time management
//!
//! Nothing here reads the wall clock. Time advances only when the external
//! scheduler says so, which keeps dead reckoning deterministic under test.

/// One tick notification from the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickInfo {
    /// Simulation time at the end of this tick, in seconds
    pub simulation_time: f64,
    /// Simulation seconds covered by this tick
    pub delta_sim_time: f64,
    /// Real seconds covered by this tick
    pub delta_real_time: f64,
}

impl TickInfo {
    /// Tick where simulation and real time advance together
    pub const fn new(simulation_time: f64, delta: f64) -> Self {
        Self {
            simulation_time,
            delta_sim_time: delta,
            delta_real_time: delta,
        }
    }

    /// Simulation time at the start of this tick
    pub fn start_time(&self) -> f64 {
        self.simulation_time - self.delta_sim_time
    }
}

/// Accumulating simulation clock
#[derive(Debug, Clone)]
pub struct SimClock {
    simulation_time: f64,
    time_scale: f64,
    tick_count: u64,
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SimClock {
    /// Clock at time zero running at real-time speed
    pub const fn new() -> Self {
        Self {
            simulation_time: 0.0,
            time_scale: 1.0,
            tick_count: 0,
        }
    }

    /// Clock starting at `simulation_time`
    pub const fn starting_at(simulation_time: f64) -> Self {
        Self {
            simulation_time,
            time_scale: 1.0,
            tick_count: 0,
        }
    }

    /// Scale applied to real time to get simulation time
    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = scale.max(0.0);
    }

    /// Current time scale
    pub const fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Advance by `delta_real_time` seconds and describe the tick
    pub fn step(&mut self, delta_real_time: f64) -> TickInfo {
        let delta_sim_time = delta_real_time * self.time_scale;
        self.simulation_time += delta_sim_time;
        self.tick_count += 1;
        TickInfo {
            simulation_time: self.simulation_time,
            delta_sim_time,
            delta_real_time,
        }
    }

    /// Current simulation time in seconds
    pub const fn simulation_time(&self) -> f64 {
        self.simulation_time
    }

    /// Number of ticks produced so far
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

/// Decrementing timer with an explicit reset trigger
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountdownTimer {
    remaining: f32,
}

impl CountdownTimer {
    /// Timer with `remaining` seconds left
    pub const fn new(remaining: f32) -> Self {
        Self { remaining }
    }

    /// Seconds left before expiry
    pub const fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Overwrite the time left
    pub fn set_remaining(&mut self, remaining: f32) {
        self.remaining = remaining;
    }

    /// Count down by `delta`.
    ///
    /// A `reset` resets to `interval` and does not fire. Otherwise the timer
    /// fires, and resets, once it reaches zero.
    pub fn advance(&mut self, delta: f32, reset: bool, interval: f32) -> bool {
        self.remaining -= delta;
        if reset {
            self.remaining = interval;
            false
        } else if self.remaining <= 0.0 {
            self.remaining = interval;
            true
        } else {
            false
        }
    }
}

impl Default for CountdownTimer {
    fn default() -> Self {
        Self::new(0.0)
    }
}
