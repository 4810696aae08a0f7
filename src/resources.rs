use sysinfo::System;

use crate::constants::LOW_MEMORY_THRESHOLD_GB;
use crate::diagnostics::Diagnostic;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Optional hook the pipeline asks once before loading.
///
/// The answer is advisory; it never changes what the pipeline does.
pub trait ResourceProbe {
    /// Available memory in bytes, if it can be determined
    fn available_memory_bytes(&self) -> Option<u64>;
}

/// Reads available memory from the operating system
#[derive(Debug, Default)]
pub struct SystemMemoryProbe;

impl ResourceProbe for SystemMemoryProbe {
    fn available_memory_bytes(&self) -> Option<u64> {
        let mut system = System::new();
        system.refresh_memory();
        match system.available_memory() {
            0 => None,
            bytes => Some(bytes),
        }
    }
}

/// Fixed answer, for tests and dry runs
#[derive(Debug, Clone, Copy)]
pub struct FixedMemoryProbe(pub u64);

impl ResourceProbe for FixedMemoryProbe {
    fn available_memory_bytes(&self) -> Option<u64> {
        Some(self.0)
    }
}

/// Turn a probe reading into the matching diagnostic
pub fn memory_diagnostic<P: ResourceProbe + ?Sized>(probe: &P) -> Option<Diagnostic> {
    let available_gb = probe.available_memory_bytes()? as f64 / BYTES_PER_GB;
    if available_gb < LOW_MEMORY_THRESHOLD_GB {
        Some(Diagnostic::LowMemory { available_gb })
    } else {
        Some(Diagnostic::MemoryAvailable { available_gb })
    }
}
