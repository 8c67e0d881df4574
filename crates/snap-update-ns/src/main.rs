//! Entry point of the snap mount namespace update helper.

use std::env;
use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Namespace entry only affects the calling thread; nothing may run first.
    let bootstrap = snap_update_ns::bootstrap::run(env::args_os());
    let mut stderr = io::stderr().lock();
    snap_update_ns::run(bootstrap, &mut stderr)
}
