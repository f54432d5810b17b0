//! Resident memory of the target process

use parking_lot::Mutex;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};

use super::types::TelemetryError;

/// Instantaneous resident-memory read
pub trait MemoryProbe: Send + Sync {
    /// Current resident set size in bytes
    fn resident_bytes(&self) -> Result<u64, TelemetryError>;
}

/// Reads the RSS of one OS process through sysinfo
pub struct ProcessMemoryProbe {
    pid: Pid,
    system: Mutex<System>,
}

impl ProcessMemoryProbe {
    /// Create a probe for `pid`, failing if the process does not exist
    pub fn new(pid: u32) -> Result<Self, TelemetryError> {
        let system = System::new_with_specifics(
            RefreshKind::nothing().with_processes(Self::refresh_kind()),
        );
        let probe = Self {
            pid: Pid::from_u32(pid),
            system: Mutex::new(system),
        };
        probe.resident_bytes()?;
        Ok(probe)
    }

    fn refresh_kind() -> ProcessRefreshKind {
        ProcessRefreshKind::nothing().with_memory()
    }
}

impl MemoryProbe for ProcessMemoryProbe {
    fn resident_bytes(&self) -> Result<u64, TelemetryError> {
        let mut system = self.system.lock();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            Self::refresh_kind(),
        );
        system
            .process(self.pid)
            .map(|process| process.memory())
            .ok_or(TelemetryError::ProcessNotFound(self.pid.as_u32()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_own_process() {
        let probe = ProcessMemoryProbe::new(std::process::id()).unwrap();
        assert!(probe.resident_bytes().unwrap() > 0);
    }

    #[test]
    fn test_unknown_pid_is_rejected() {
        let result = ProcessMemoryProbe::new(u32::MAX - 1);
        assert!(matches!(result, Err(TelemetryError::ProcessNotFound(_))));
    }
}
