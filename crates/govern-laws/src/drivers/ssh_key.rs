//! `SshKey` driver (spec §4.E): ensure `~/.ssh/authorized_keys` contains
//! the given public key line.

use async_trait::async_trait;
use govern_facts::Facts;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use crate::error::ResourceError;
use crate::model::{ChangeReport, Resource, SshKey};

fn home_and_ids(user: &str) -> Result<(PathBuf, u32, u32), ResourceError> {
    let text = std::fs::read_to_string("/etc/passwd")?;
    for line in text.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.first() == Some(&user) && fields.len() >= 6 {
            let uid: u32 = fields[2].parse().map_err(|_| ResourceError::permanent("malformed /etc/passwd uid"))?;
            let gid: u32 = fields[3].parse().map_err(|_| ResourceError::permanent("malformed /etc/passwd gid"))?;
            return Ok((PathBuf::from(fields[5]), uid, gid));
        }
    }
    Err(ResourceError::permanent(format!("no such user: {user}")))
}

#[async_trait]
impl Resource for SshKey {
    async fn ensure(&self, dry_run: bool, _facts: &Facts) -> Result<ChangeReport, ResourceError> {
        let (home, uid, gid) = home_and_ids(&self.user)?;
        let ssh_dir = home.join(".ssh");
        let authorized_keys = ssh_dir.join("authorized_keys");

        let already_present = std::fs::read_to_string(&authorized_keys)
            .map(|c| c.lines().any(|l| l == self.key))
            .unwrap_or(false);

        if already_present {
            return Ok(ChangeReport::Unchanged);
        }

        if dry_run {
            return Ok(ChangeReport::WouldChange { reason: format!("would append authorized key for {}", self.user) });
        }

        if !ssh_dir.exists() {
            std::fs::create_dir_all(&ssh_dir)?;
            std::fs::set_permissions(&ssh_dir, std::fs::Permissions::from_mode(0o700))?;
            chown(&ssh_dir, uid, gid)?;
        }

        let mut contents = std::fs::read_to_string(&authorized_keys).unwrap_or_default();
        if !contents.is_empty() && !contents.ends_with('\n') {
            contents.push('\n');
        }
        contents.push_str(&self.key);
        contents.push('\n');
        std::fs::write(&authorized_keys, contents)?;
        std::fs::set_permissions(&authorized_keys, std::fs::Permissions::from_mode(0o600))?;
        chown(&authorized_keys, uid, gid)?;

        Ok(ChangeReport::Changed { summary: format!("appended authorized key for {}", self.user) })
    }
}

fn chown(path: &std::path::Path, uid: u32, gid: u32) -> Result<(), ResourceError> {
    use std::os::unix::ffi::OsStrExt;
    let c_path = std::ffi::CString::new(path.as_os_str().as_bytes())
        .map_err(|e| ResourceError::permanent(format!("path contains NUL: {e}")))?;
    let ret = unsafe { libc::chown(c_path.as_ptr(), uid, gid) };
    if ret != 0 {
        return Err(ResourceError::from(std::io::Error::last_os_error()));
    }
    Ok(())
}
