//! Native argument vector -> runtime-owned string list.

use crate::config::types::PreEntryFailure;
use crate::runtime::ManagedRuntime;
use std::ffi::OsString;

/// Copy every argument into a runtime string list, preserving count, order
/// and bytes. Zero-length arguments are allocated like any other.
///
/// The pending exception flag is checked after the list allocation and after
/// each string allocation. On the first failure the partially built list is
/// dropped and nothing escapes.
pub fn marshal<R, A>(runtime: &mut R, args: &[A]) -> Result<R::StringList, PreEntryFailure>
where
    R: ManagedRuntime,
    A: AsRef<[u8]>,
{
    let mut list = runtime.new_string_list(args.len());
    if runtime.exception_occurred() {
        return Err(PreEntryFailure::AllocationFailure);
    }

    for (index, arg) in args.iter().enumerate() {
        let item = runtime.new_string(arg.as_ref());
        if runtime.exception_occurred() {
            log::debug!("Allocation failed while marshalling argument {}", index);
            return Err(PreEntryFailure::AllocationFailure);
        }
        runtime.set_list_item(&mut list, index, item);
    }

    Ok(list)
}

/// The process argument vector as raw bytes, program name included
pub fn native_args() -> Vec<Vec<u8>> {
    std::env::args_os().map(os_to_bytes).collect()
}

#[cfg(unix)]
fn os_to_bytes(arg: OsString) -> Vec<u8> {
    use std::os::unix::ffi::OsStringExt;
    arg.into_vec()
}

/// Windows arguments are UTF-16; unpaired surrogates are replaced.
#[cfg(not(unix))]
fn os_to_bytes(arg: OsString) -> Vec<u8> {
    match arg.into_string() {
        Ok(s) => s.into_bytes(),
        Err(os) => os.to_string_lossy().into_owned().into_bytes(),
    }
}
