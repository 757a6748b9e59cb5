//! Distro and init-system detection.
//!
//! `original_source/pkg/facts/distro.go` probes release files through a
//! fall-through `if DistroX() { return } if DistroY() { return } ...` chain,
//! each function mutating a package-global `Facts.Distro` as a side effect.
//! Per the distro-detection-ordering redesign, this is instead a fixed list
//! of pure `fn() -> Option<DistroFacts>` detectors tried in order; the first
//! `Some` wins. Init-system detection stays an independent probe, run
//! unconditionally regardless of which distro matched, matching the
//! original calling `initSystem()` before the distro chain.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DistroFacts {
    pub name: String,
    pub slug: String,
    pub family: String,
    pub version: String,
    pub codename: String,
}

type Detector = fn() -> Option<DistroFacts>;

const DETECTORS: &[Detector] = &[detect_alpine, detect_ubuntu, detect_arch, detect_rhel, detect_fedora];

pub fn detect() -> DistroFacts {
    DETECTORS
        .iter()
        .find_map(|detector| detector())
        .unwrap_or_default()
}

fn detect_alpine() -> Option<DistroFacts> {
    let release = std::fs::read_to_string("/etc/alpine-release").ok()?;
    Some(DistroFacts {
        name: "Alpine".into(),
        slug: "alpine".into(),
        family: "alpine".into(),
        version: release.trim().to_string(),
        codename: String::new(),
    })
}

fn detect_ubuntu() -> Option<DistroFacts> {
    let text = std::fs::read_to_string("/etc/lsb-release").ok()?;
    let mut version = String::new();
    let mut codename = String::new();
    for line in text.lines() {
        if let Some(v) = line.strip_prefix("DISTRIB_RELEASE=") {
            version = v.trim().to_string();
        }
        if let Some(c) = line.strip_prefix("DISTRIB_CODENAME=") {
            codename = c.trim().to_string();
        }
    }
    Some(DistroFacts {
        name: "Ubuntu".into(),
        slug: "ubuntu".into(),
        family: "debian".into(),
        version,
        codename,
    })
}

fn detect_arch() -> Option<DistroFacts> {
    std::fs::metadata("/etc/arch-release").ok()?;
    Some(DistroFacts {
        name: "Arch Linux".into(),
        slug: "arch".into(),
        family: "arch".into(),
        version: "rolling".into(),
        codename: String::new(),
    })
}

fn detect_rhel() -> Option<DistroFacts> {
    let content = std::fs::read_to_string("/etc/redhat-release").ok()?;
    let line = content.trim();
    let version = line
        .split_whitespace()
        .nth(6)
        .unwrap_or("unknown")
        .to_string();
    Some(DistroFacts {
        name: "Red Hat Enterprise Linux".into(),
        slug: "rhel".into(),
        family: "rhel".into(),
        version,
        codename: String::new(),
    })
}

fn detect_fedora() -> Option<DistroFacts> {
    let content = std::fs::read_to_string("/etc/fedora-release").ok()?;
    let line = content.trim();
    let version = line
        .split_whitespace()
        .nth(2)
        .unwrap_or("unknown")
        .to_string();
    Some(DistroFacts {
        name: "Fedora".into(),
        slug: "fedora".into(),
        family: "rhel".into(),
        version,
        codename: String::new(),
    })
}

/// Independent of distro: resolve which init system is managing services.
pub fn init_system() -> String {
    if let Ok(target) = std::fs::read_link("/sbin/init") {
        let target = target.to_string_lossy();
        for (needle, name) in [
            ("systemd", "systemd"),
            ("openrc", "openrc"),
            ("runit", "runit"),
            ("sysvinit", "sysvinit"),
            ("upstart", "upstart"),
        ] {
            if target.contains(needle) {
                return name.to_string();
            }
        }
    }

    let probes: &[(&str, &str)] = &[
        ("/bin/systemctl", "systemd"),
        ("/etc/init.d", "sysvinit"),
        ("/etc/runit", "runit"),
        ("/etc/openrc", "openrc"),
        ("/sbin/initctl", "upstart"),
    ];
    for (path, name) in probes {
        if std::path::Path::new(path).exists() {
            return name.to_string();
        }
    }

    "systemd".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_detector_wins() {
        // Detector order is fixed; verifying the list contains alpine first
        // guards against an accidental reorder silently changing precedence.
        assert_eq!(DETECTORS[0] as usize, detect_alpine as usize);
    }
}
