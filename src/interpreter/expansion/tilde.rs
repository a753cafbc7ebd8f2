//! Tilde Expansion
//!
//! `~` resolves against `$HOME`, `~+` and `~-` against `$PWD`/`$OLDPWD`,
//! and `~name` against the password database. Anything unresolvable is
//! left as written.

use std::ffi::{CStr, CString};

use crate::interpreter::runner::Runner;

/// Home directory of `name` from the password database.
fn home_of_user(name: &str) -> Option<String> {
    let c_name = CString::new(name).ok()?;
    let mut buf = vec![0 as libc::c_char; 4096];
    // SAFETY: zeroed passwd is a valid out-parameter for getpwnam_r.
    let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
    let mut result: *mut libc::passwd = std::ptr::null_mut();
    // SAFETY: every pointer refers to a live local buffer of the stated size.
    let rc = unsafe { libc::getpwnam_r(c_name.as_ptr(), &mut pwd, buf.as_mut_ptr(), buf.len(), &mut result) };
    if rc != 0 || result.is_null() || pwd.pw_dir.is_null() {
        return None;
    }
    // SAFETY: pw_dir points into `buf`, which is still alive.
    let dir = unsafe { CStr::from_ptr(pwd.pw_dir) };
    Some(dir.to_string_lossy().into_owned())
}

impl Runner {
    pub(crate) fn expand_tilde(&self, user: Option<&str>) -> String {
        let resolved = match user {
            None => self.get_var("HOME"),
            Some("+") => Some(self.get_var("PWD").unwrap_or_else(|| self.cwd.to_string_lossy().into_owned())),
            Some("-") => self.get_var("OLDPWD"),
            Some(name) => home_of_user(name),
        };
        resolved.unwrap_or_else(|| format!("~{}", user.unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::environment::Environment;

    #[test]
    fn test_home() {
        let runner = Runner::new(Environment::from_exported([("HOME", "/home/me")]), "/tmp".into());
        assert_eq!(runner.expand_tilde(None), "/home/me");
    }

    #[test]
    fn test_unresolvable_stays_literal() {
        let runner = Runner::new(Environment::new(), "/tmp".into());
        assert_eq!(runner.expand_tilde(None), "~");
        assert_eq!(runner.expand_tilde(Some("no-such-user-here")), "~no-such-user-here");
    }
}
