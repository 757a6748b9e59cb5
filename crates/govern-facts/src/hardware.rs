//! CPU, system UUID, and total memory facts.
//!
//! Grounded on `original_source/pkg/facts/hardware.go`: the same
//! `/sys/class/dmi/id/product_uuid` read (with a distinct message on
//! permission-denied, since many collectors run unprivileged) and the same
//! `/proc/cpuinfo` line-prefix scan with the same x86 vendor-id and ARM
//! implementor/part lookup tables.

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CpuInfo {
    pub arch: String,
    pub vendor: String,
    pub model: String,
    pub cores: u32,
    pub threads: u32,
    pub flags: Vec<String>,
}

impl CpuInfo {
    pub fn collect() -> Self {
        let text = std::fs::read_to_string("/proc/cpuinfo").unwrap_or_default();
        Self::from_cpuinfo(&text)
    }

    fn from_cpuinfo(text: &str) -> Self {
        let mut info = CpuInfo {
            arch: std::env::consts::ARCH.to_string(),
            ..Default::default()
        };

        for line in text.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "vendor_id" => {
                    info.vendor = match value {
                        "GenuineIntel" => "intel".to_string(),
                        "AuthenticAMD" => "amd".to_string(),
                        other => other.to_string(),
                    };
                }
                "CPU implementor" => {
                    info.vendor = match value {
                        "0x41" => "arm".to_string(),
                        "0x42" => "broadcom".to_string(),
                        "0x43" => "cavium".to_string(),
                        other => other.to_string(),
                    };
                }
                "CPU part" => {
                    info.model = match value {
                        "0xd0b" => "Cortex-A76".to_string(),
                        "0xd05" => "Cortex-A55".to_string(),
                        other => other.to_string(),
                    };
                }
                "model name" => info.model = value.to_string(),
                "cpu cores" => info.cores = value.parse().unwrap_or(info.cores),
                "siblings" => info.threads = value.parse().unwrap_or(info.threads),
                "flags" => info.flags = value.split_whitespace().map(str::to_string).collect(),
                _ => {}
            }
        }

        info
    }
}

pub(crate) fn system_uuid() -> String {
    match std::fs::read_to_string("/sys/class/dmi/id/product_uuid") {
        Ok(uuid) => uuid.trim().to_string(),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            format!("unable to open UUID file, are you root? ({e})")
        }
        Err(e) => format!("error: {e}"),
    }
}

pub(crate) fn memory_total_kb() -> u64 {
    let Ok(text) = std::fs::read_to_string("/proc/meminfo") else {
        return 0;
    };
    text.lines()
        .find(|l| l.starts_with("MemTotal:"))
        .and_then(|l| l.split_whitespace().nth(1))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_intel_vendor_id_and_parses_fields() {
        let cpuinfo = "vendor_id\t: GenuineIntel\nmodel name\t: Test CPU\ncpu cores\t: 4\nsiblings\t: 8\nflags\t\t: fpu vme de\n";
        let info = CpuInfo::from_cpuinfo(cpuinfo);
        assert_eq!(info.vendor, "intel");
        assert_eq!(info.model, "Test CPU");
        assert_eq!(info.cores, 4);
        assert_eq!(info.threads, 8);
        assert_eq!(info.flags, vec!["fpu", "vme", "de"]);
    }

    #[test]
    fn maps_arm_implementor_and_part() {
        let cpuinfo = "CPU implementor\t: 0x41\nCPU part\t: 0xd0b\n";
        let info = CpuInfo::from_cpuinfo(cpuinfo);
        assert_eq!(info.vendor, "arm");
        assert_eq!(info.model, "Cortex-A76");
    }
}
