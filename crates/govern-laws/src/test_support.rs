//! Shared test fixtures. Only compiled under `#[cfg(test)]`.

#![cfg(test)]

use govern_facts::Facts;

/// A minimal, cheap-to-construct `Facts` for driver tests that don't
/// exercise distro-dependent branches — `Facts::collect()` walks `/proc`
/// and is unnecessarily slow (and non-deterministic across CI hosts) for
/// tests that only care about idempotency.
pub fn minimal_facts() -> Facts {
    serde_json::from_value(serde_json::json!({
        "hostname": "test", "uid": 0, "euid": 0, "gid": 0, "egid": 0, "groups": [],
        "pid": 1, "ppid": 0, "environ": [], "system_uuid": "", "memory_total_kb": 0,
        "init_system": "systemd",
        "cpu": {"arch": "x86_64", "vendor": "", "model": "", "cores": 0, "threads": 0, "flags": []},
        "distro": {"name": "", "slug": "", "family": "debian", "version": "", "codename": ""},
        "network": [], "storage": {"local_disks": []}, "ceph": null
    }))
    .unwrap()
}

pub fn facts_with_family(family: &str) -> Facts {
    let mut facts = minimal_facts();
    facts.distro.family = family.to_string();
    facts
}
