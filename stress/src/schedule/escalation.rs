//! Escalating burst count and burst size
//!
//! Burst size grows by `requests_per_burst_incr` after every burst launch and
//! resets at the end of each loop; burst count grows by
//! `bursts_per_loop_incr` after every loop. A per-iteration sequence replaces
//! the running value at the start of its iteration.

use crate::config::{Escalation, ScheduleConfig};

/// Running escalation state, owned by the loop driver
#[derive(Debug, Clone)]
pub struct Escalator {
    bursts: Escalation,
    bursts_incr: usize,
    requests: Escalation,
    requests_incr: usize,
    bursts_per_loop: usize,
    requests_per_burst: usize,
}

impl Escalator {
    pub fn new(config: &ScheduleConfig) -> Self {
        Self {
            bursts_per_loop: config.bursts_per_loop_min.min(),
            requests_per_burst: config.requests_per_burst_min.min(),
            bursts: config.bursts_per_loop_min.clone(),
            bursts_incr: config.bursts_per_loop_incr,
            requests: config.requests_per_burst_min.clone(),
            requests_incr: config.requests_per_burst_incr,
        }
    }

    /// Enter iteration `iteration`, applying any explicit overrides.
    /// Returns the number of bursts to launch.
    pub fn begin_loop(&mut self, iteration: usize) -> usize {
        if let Some(bursts) = self.bursts.override_for(iteration) {
            self.bursts_per_loop = bursts;
        }
        if let Some(requests) = self.requests.override_for(iteration) {
            self.requests_per_burst = requests;
        }
        self.bursts_per_loop
    }

    /// Size of the burst about to be launched; the next one is bigger
    pub fn next_burst_size(&mut self) -> usize {
        let size = self.requests_per_burst;
        self.requests_per_burst = self.requests_per_burst.saturating_add(self.requests_incr);
        size
    }

    /// Leave the current iteration
    pub fn end_loop(&mut self) {
        self.requests_per_burst = self.requests.min();
        self.bursts_per_loop = self.bursts_per_loop.saturating_add(self.bursts_incr);
    }

    pub fn bursts_per_loop(&self) -> usize {
        self.bursts_per_loop
    }

    pub fn requests_per_burst(&self) -> usize {
        self.requests_per_burst
    }

    /// Burst sizes of every loop the schedule will run, without running it
    pub fn plan(config: &ScheduleConfig) -> Vec<Vec<usize>> {
        let mut escalator = Self::new(config);
        (0..config.loop_count)
            .map(|iteration| {
                let bursts = escalator.begin_loop(iteration);
                let sizes = (0..bursts).map(|_| escalator.next_burst_size()).collect();
                escalator.end_loop();
                sizes
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(
        bursts: Escalation,
        bursts_incr: usize,
        requests: Escalation,
        requests_incr: usize,
        loop_count: usize,
    ) -> ScheduleConfig {
        ScheduleConfig {
            bursts_per_loop_min: bursts,
            bursts_per_loop_incr: bursts_incr,
            requests_per_burst_min: requests,
            requests_per_burst_incr: requests_incr,
            loop_count,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_plan() {
        let config = schedule(Escalation::Fixed(3), 2, Escalation::Fixed(20), 10, 4);
        let plan = Escalator::plan(&config);

        let counts: Vec<usize> = plan.iter().map(|sizes| sizes.len()).collect();
        assert_eq!(counts, vec![3, 5, 7, 9]);
        assert_eq!(plan[0], vec![20, 30, 40]);
        assert_eq!(plan[3], vec![20, 30, 40, 50, 60, 70, 80, 90, 100]);
    }

    #[test]
    fn test_burst_size_formula() {
        let config = schedule(Escalation::Fixed(4), 1, Escalation::Fixed(7), 3, 5);
        for (i, sizes) in Escalator::plan(&config).iter().enumerate() {
            assert_eq!(sizes.len(), 4 + i);
            for (j, size) in sizes.iter().enumerate() {
                assert_eq!(*size, 7 + j * 3);
            }
        }
    }

    #[test]
    fn test_override_sequence_wins() {
        let config = schedule(
            Escalation::PerLoop(vec![2, 1, 4]),
            5,
            Escalation::PerLoop(vec![10, 3, 8]),
            1,
            3,
        );
        let plan = Escalator::plan(&config);
        assert_eq!(plan, vec![vec![10, 11], vec![3], vec![8, 9, 10, 11]]);
    }

    #[test]
    fn test_mixed_override_and_scalar() {
        let config = schedule(
            Escalation::Fixed(1),
            1,
            Escalation::PerLoop(vec![5, 50]),
            0,
            2,
        );
        let plan = Escalator::plan(&config);
        assert_eq!(plan, vec![vec![5], vec![50, 50]]);
    }

    #[test]
    fn test_stepwise_state() {
        let config = schedule(Escalation::Fixed(2), 2, Escalation::Fixed(5), 5, 2);
        let mut escalator = Escalator::new(&config);

        assert_eq!(escalator.begin_loop(0), 2);
        assert_eq!(escalator.next_burst_size(), 5);
        assert_eq!(escalator.next_burst_size(), 10);
        assert_eq!(escalator.requests_per_burst(), 15);
        escalator.end_loop();

        assert_eq!(escalator.requests_per_burst(), 5);
        assert_eq!(escalator.bursts_per_loop(), 4);
        assert_eq!(escalator.begin_loop(1), 4);
    }

    #[test]
    fn test_zero_sized_bursts() {
        let config = schedule(Escalation::Fixed(2), 0, Escalation::Fixed(0), 0, 1);
        assert_eq!(Escalator::plan(&config), vec![vec![0, 0]]);
    }
}
