//! Lifecycle management for the package-manager child process
//!
//! `npm install` spawns its own children (node-gyp, compilers). If nodeprep
//! is interrupted mid-install those would keep writing into a dependency
//! directory that the next run is about to delete.
//!
//! - Children are spawned in their own process group
//! - Running child PIDs are tracked in a global registry
//! - On SIGINT/SIGTERM/SIGHUP the whole group gets SIGTERM, then SIGKILL
//!   after a grace period

use std::collections::HashSet;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

/// Global registry of child process IDs
static CHILD_REGISTRY: OnceLock<Arc<Mutex<ChildRegistry>>> = OnceLock::new();

/// Registry tracking spawned child processes
#[derive(Debug, Default)]
pub struct ChildRegistry {
    pids: HashSet<u32>,
    cleanup_initiated: bool,
}

impl ChildRegistry {
    /// Get or create the global child registry
    pub fn global() -> Arc<Mutex<ChildRegistry>> {
        CHILD_REGISTRY
            .get_or_init(|| Arc::new(Mutex::new(ChildRegistry::default())))
            .clone()
    }

    pub fn register(&mut self, pid: u32) {
        self.pids.insert(pid);
        tracing::debug!("Registered child process PID {}", pid);
    }

    pub fn unregister(&mut self, pid: u32) {
        self.pids.remove(&pid);
        tracing::debug!("Unregistered child process PID {}", pid);
    }

    pub fn count(&self) -> usize {
        self.pids.len()
    }

    /// Terminate all tracked process groups.
    /// Sends SIGTERM first, waits up to `grace_period`, then SIGKILL.
    pub fn terminate_all(&mut self, grace_period: Duration) {
        if self.cleanup_initiated || self.pids.is_empty() {
            return;
        }
        self.cleanup_initiated = true;

        tracing::info!("Terminating {} child process(es)...", self.pids.len());
        let pids: Vec<u32> = self.pids.iter().copied().collect();
        for &pid in &pids {
            if let Err(e) = sys::terminate_group(pid) {
                tracing::warn!("Failed to send SIGTERM to process group {}: {}", pid, e);
            }
        }

        let start = Instant::now();
        while start.elapsed() < grace_period {
            if pids.iter().all(|&pid| !sys::is_alive(pid)) {
                tracing::info!("All child processes terminated gracefully");
                self.pids.clear();
                return;
            }
            std::thread::sleep(Duration::from_millis(100));
        }

        for &pid in pids.iter().filter(|&&pid| sys::is_alive(pid)) {
            tracing::warn!("Process group {} did not terminate, sending SIGKILL", pid);
            let _ = sys::kill_group(pid);
        }
        self.pids.clear();
    }
}

/// Register a running child for the duration of `f`
pub fn with_registered_child<T>(pid: u32, f: impl FnOnce() -> T) -> T {
    if let Ok(mut registry) = ChildRegistry::global().lock() {
        registry.register(pid);
    }
    let result = f();
    if let Ok(mut registry) = ChildRegistry::global().lock() {
        registry.unregister(pid);
    }
    result
}

/// Install signal handlers that clean up registered children and exit with
/// `128 + signal`. Call once at program start.
#[cfg(unix)]
pub fn init_signal_handlers() -> Result<(), std::io::Error> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;

    std::thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            tracing::info!("Received signal {}, cleaning up...", sig);
            if let Ok(mut registry) = ChildRegistry::global().lock() {
                registry.terminate_all(Duration::from_secs(3));
            }
            std::process::exit(128 + sig);
        }
    });

    Ok(())
}

#[cfg(not(unix))]
pub fn init_signal_handlers() -> Result<(), std::io::Error> {
    Ok(())
}

/// Extension trait for `std::process::Command` to set up process groups
pub trait CommandProcessGroup {
    /// Run the command as the leader of a new process group, so the whole
    /// tree it spawns can be signalled at once
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for std::process::Command {
    #[cfg(unix)]
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        self.process_group(0)
    }

    #[cfg(not(unix))]
    fn in_new_process_group(&mut self) -> &mut Self {
        self
    }
}

#[cfg(unix)]
mod sys {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    fn group(pgid: u32) -> Pid {
        Pid::from_raw(-(pgid as i32))
    }

    pub fn terminate_group(pgid: u32) -> nix::Result<()> {
        signal::kill(group(pgid), Signal::SIGTERM)
    }

    pub fn kill_group(pgid: u32) -> nix::Result<()> {
        signal::kill(group(pgid), Signal::SIGKILL)
    }

    /// Alive means signalable and not a zombie
    pub fn is_alive(pid: u32) -> bool {
        if signal::kill(Pid::from_raw(pid as i32), None).is_err() {
            return false;
        }
        // Field 3 of /proc/<pid>/stat is the state; Z and X are dead
        if let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            if let Some(state) = stat
                .rsplit_once(')')
                .and_then(|(_, rest)| rest.split_whitespace().next())
            {
                return !matches!(state, "Z" | "X");
            }
        }
        true
    }
}

#[cfg(not(unix))]
mod sys {
    pub fn terminate_group(_pgid: u32) -> std::io::Result<()> {
        Ok(())
    }

    pub fn kill_group(_pgid: u32) -> std::io::Result<()> {
        Ok(())
    }

    pub fn is_alive(_pid: u32) -> bool {
        false
    }
}
