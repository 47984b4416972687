use sysinfo::{Pid, ProcessRefreshKind, RefreshKind, System};

/// Fraction of the configured cap at which memory is considered critical.
const CRITICAL_FRACTION: f64 = 0.8;

/// Current RSS of this process in megabytes.
///
/// Cheap enough to poll per request; returns 0.0 when the process cannot
/// be inspected rather than failing.
pub fn memory_usage_mb() -> f64 {
    let refresh =
        RefreshKind::new().with_processes(ProcessRefreshKind::new().with_memory());
    let system = System::new_with_specifics(refresh);
    system
        .process(Pid::from_u32(std::process::id()))
        .map(|p| p.memory() as f64 / 1024.0 / 1024.0)
        .unwrap_or(0.0)
}

/// Whether usage has crossed 80% of the configured hard cap.
pub fn is_memory_critical(max_memory_mb: f64) -> bool {
    memory_usage_mb() > max_memory_mb * CRITICAL_FRACTION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_is_nonnegative() {
        assert!(memory_usage_mb() >= 0.0);
    }

    #[test]
    fn generous_cap_is_not_critical() {
        // No test process uses a terabyte.
        assert!(!is_memory_critical(1_048_576.0));
    }

    #[test]
    fn zero_cap_is_always_critical() {
        assert!(is_memory_critical(0.0) || memory_usage_mb() == 0.0);
    }
}
