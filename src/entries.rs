//! Owner and group name lookup.

use std::ffi::CStr;
use std::io;

use libc::{c_char, getgrgid_r, getpwuid_r, gid_t, group, passwd, uid_t};

const INITIAL_BUF_SIZE: usize = 1024;

fn cstr_to_string(ptr: *const c_char) -> String {
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

/// Resolve a user id to its login name.
pub fn uid2usr(uid: uid_t) -> io::Result<String> {
    let mut pwd: passwd = unsafe { std::mem::zeroed() };
    let mut result: *mut passwd = std::ptr::null_mut();
    let mut buf = vec![0 as c_char; INITIAL_BUF_SIZE];

    loop {
        let err = unsafe { getpwuid_r(uid, &mut pwd, buf.as_mut_ptr(), buf.len(), &mut result) };
        if err == 0 {
            return if result.is_null() {
                Err(io::ErrorKind::NotFound.into())
            } else {
                Ok(cstr_to_string(pwd.pw_name))
            };
        }
        if err == libc::ERANGE {
            buf.resize(buf.len() * 2, 0);
        } else {
            return Err(io::Error::from_raw_os_error(err));
        }
    }
}

/// Resolve a group id to its group name.
pub fn gid2grp(gid: gid_t) -> io::Result<String> {
    let mut grp: group = unsafe { std::mem::zeroed() };
    let mut result: *mut group = std::ptr::null_mut();
    let mut buf = vec![0 as c_char; INITIAL_BUF_SIZE];

    loop {
        let err = unsafe { getgrgid_r(gid, &mut grp, buf.as_mut_ptr(), buf.len(), &mut result) };
        if err == 0 {
            return if result.is_null() {
                Err(io::ErrorKind::NotFound.into())
            } else {
                Ok(cstr_to_string(grp.gr_name))
            };
        }
        if err == libc::ERANGE {
            buf.resize(buf.len() * 2, 0);
        } else {
            return Err(io::Error::from_raw_os_error(err));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_ids_resolve() {
        let uid = unsafe { libc::geteuid() };
        let gid = unsafe { libc::getegid() };
        assert!(!uid2usr(uid).unwrap().is_empty());
        assert!(!gid2grp(gid).unwrap().is_empty());
    }
}
