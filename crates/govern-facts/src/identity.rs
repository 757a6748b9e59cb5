//! Process identity facts: hostname, uid/gid family, pid, environment.
//!
//! Grounded on `original_source/pkg/facts/main.go`'s `init()`, translated
//! from direct syscalls (`os.Getuid`, `syscall.Sysinfo`) to `/proc`
//! parsing, which keeps this collector dependency-free and in the same
//! parsing idiom as the CPU/distro collectors.

pub(crate) struct Identity {
    pub hostname: String,
    pub uid: u32,
    pub euid: u32,
    pub gid: u32,
    pub egid: u32,
    pub groups: Vec<u32>,
    pub pid: u32,
    pub ppid: u32,
    pub environ: Vec<String>,
}

pub(crate) fn collect() -> Identity {
    let status = std::fs::read_to_string("/proc/self/status").unwrap_or_default();
    let (uid, euid) = read_id_pair(&status, "Uid:");
    let (gid, egid) = read_id_pair(&status, "Gid:");
    let groups = status
        .lines()
        .find(|l| l.starts_with("Groups:"))
        .map(|l| {
            l.trim_start_matches("Groups:")
                .split_whitespace()
                .filter_map(|g| g.parse().ok())
                .collect()
        })
        .unwrap_or_default();

    let ppid = std::fs::read_to_string("/proc/self/stat")
        .ok()
        .and_then(|s| parse_ppid(&s))
        .unwrap_or(0);

    Identity {
        hostname: std::fs::read_to_string("/proc/sys/kernel/hostname")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| "unknown".to_string()),
        uid,
        euid,
        gid,
        egid,
        groups,
        pid: std::process::id(),
        ppid,
        environ: std::env::vars().map(|(k, v)| format!("{k}={v}")).collect(),
    }
}

/// `/proc/self/status` lines like `Uid:\t1000\t1000\t1000\t1000` are
/// real/effective/saved/filesystem; we only need the first two.
fn read_id_pair(status: &str, prefix: &str) -> (u32, u32) {
    status
        .lines()
        .find(|l| l.starts_with(prefix))
        .and_then(|l| {
            let mut parts = l.trim_start_matches(prefix).split_whitespace();
            let real: u32 = parts.next()?.parse().ok()?;
            let effective: u32 = parts.next()?.parse().ok()?;
            Some((real, effective))
        })
        .unwrap_or((0, 0))
}

/// `/proc/<pid>/stat`'s 4th whitespace-separated field (after the
/// parenthesized comm name, which may itself contain spaces) is ppid.
fn parse_ppid(stat: &str) -> Option<u32> {
    let after_comm = stat.rsplit_once(')')?.1;
    after_comm.split_whitespace().nth(1)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ppid_with_spaces_in_comm() {
        let stat = "1234 (my process) S 1 1234 1234 0 -1 4194304 100 0 0 0";
        assert_eq!(parse_ppid(stat), Some(1));
    }

    #[test]
    fn parses_uid_pair() {
        let status = "Name:\tbash\nUid:\t1000\t1000\t1000\t1000\n";
        assert_eq!(read_id_pair(status, "Uid:"), (1000, 1000));
    }
}
