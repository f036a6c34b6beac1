//! Resource usage of a run: peak memory, CPU and wall time, and the same figures per tick and
//! per person. The runner logs them at `info` when the run ends.
#![allow(clippy::cast_precision_loss)]

use std::time::{Duration, Instant};

use bytesize::ByteSize;
use humantime::format_duration;
use log::{debug, error, info};
use serde_derive::Serialize;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Minimum time between two memory polls.
const MEMORY_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Summary of the resources a run consumed. When the population or the tick count is zero the
/// corresponding per-unit statistics are zero too.
#[derive(Serialize, Debug, Clone)]
pub struct ExecutionStatistics {
    pub max_memory_usage: u64,
    pub cpu_time: Duration,
    pub wall_time: Duration,

    pub n_ticks: usize,
    pub wall_time_per_tick: Duration,

    /// Initial population, the denominator of the per-person figures.
    pub population: usize,
    pub wall_time_per_person: Duration,
    pub memory_per_person: u64,
}

pub struct ExecutionProfilingCollector {
    start_time: Instant,
    last_poll: Instant,
    /// Process CPU milliseconds already spent before the run started.
    start_cpu_time: u64,
    /// Peak resident memory in bytes seen so far.
    max_memory_usage: u64,
    system: System,
    /// `None` where sysinfo cannot identify the process.
    process_id: Option<Pid>,
}

impl Default for ExecutionProfilingCollector {
    fn default() -> Self {
        ExecutionProfilingCollector::new()
    }
}

impl ExecutionProfilingCollector {
    #[must_use]
    pub fn new() -> ExecutionProfilingCollector {
        let process_id = sysinfo::get_current_pid().ok();
        let now = Instant::now();

        let mut collector = ExecutionProfilingCollector {
            start_time: now,
            last_poll: now,
            start_cpu_time: 0,
            max_memory_usage: 0,
            system: System::new(),
            process_id,
        };
        if let Some(process_id) = process_id {
            debug!("profiling process {process_id}");
            collector.update_system_info(ProcessRefreshKind::nothing().with_cpu().with_memory());
            if let Some(process) = collector.system.process(process_id) {
                collector.max_memory_usage = process.memory();
                collector.start_cpu_time = process.accumulated_cpu_time();
            }
        }
        collector
    }

    /// Cheap enough to call every tick: memory is only polled once per `MEMORY_POLL_INTERVAL`.
    #[inline]
    pub fn refresh(&mut self) {
        if self.last_poll.elapsed() >= MEMORY_POLL_INTERVAL {
            self.poll_memory();
            self.last_poll = Instant::now();
        }
    }

    fn poll_memory(&mut self) {
        if let Some(pid) = self.process_id {
            self.update_system_info(ProcessRefreshKind::nothing().with_memory());
            if let Some(process) = self.system.process(pid) {
                self.max_memory_usage = self.max_memory_usage.max(process.memory());
            }
        }
    }

    #[inline]
    fn update_system_info(&mut self, process_refresh_kind: ProcessRefreshKind) {
        if let Some(pid) = self.process_id {
            if self.system.refresh_processes_specifics(
                ProcessesToUpdate::Some(&[pid]),
                true,
                process_refresh_kind,
            ) < 1
            {
                error!("could not refresh process statistics");
            }
        }
    }

    /// Takes a last CPU and memory reading and divides the totals over `population` people and
    /// `n_ticks` ticks.
    pub fn compute_final_statistics(
        &mut self,
        population: usize,
        n_ticks: usize,
    ) -> ExecutionStatistics {
        let mut cpu_time_millis = 0;
        if let Some(pid) = self.process_id {
            self.update_system_info(ProcessRefreshKind::nothing().with_cpu().with_memory());
            if let Some(process) = self.system.process(pid) {
                self.max_memory_usage = self.max_memory_usage.max(process.memory());
                cpu_time_millis = process
                    .accumulated_cpu_time()
                    .saturating_sub(self.start_cpu_time);
            }
        }

        let cpu_time = Duration::from_millis(cpu_time_millis);
        let wall_time = self.start_time.elapsed();

        let per = |count: usize| {
            if count > 0 {
                Duration::from_secs_f64(wall_time.as_secs_f64() / count as f64)
            } else {
                Duration::ZERO
            }
        };
        let memory_per_person = if population > 0 {
            self.max_memory_usage / population as u64
        } else {
            0
        };

        ExecutionStatistics {
            max_memory_usage: self.max_memory_usage,
            cpu_time,
            wall_time,
            n_ticks,
            wall_time_per_tick: per(n_ticks),
            population,
            wall_time_per_person: per(population),
            memory_per_person,
        }
    }
}

pub fn log_execution_statistics(stats: &ExecutionStatistics) {
    if stats.max_memory_usage == 0 {
        info!("memory and CPU usage unavailable");
    } else {
        info!(
            "peak memory {}, CPU time {}",
            ByteSize::b(stats.max_memory_usage),
            format_duration(stats.cpu_time)
        );
    }
    info!("wall time {}", format_duration(stats.wall_time));
    if stats.n_ticks > 0 {
        info!(
            "{} ticks, {} per tick",
            stats.n_ticks,
            format_duration(stats.wall_time_per_tick)
        );
    }
    if stats.population > 0 {
        info!(
            "{} people, {} and {} per person",
            stats.population,
            ByteSize::b(stats.memory_per_person),
            format_duration(stats.wall_time_per_person)
        );
    }
}
