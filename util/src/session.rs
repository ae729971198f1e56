//! Session management
//!
//! A session is one run of an executable. It owns a timestamped directory under
//! `$HEX_SW_ROOT/<sessions_dir>` holding the log file, the `arch` folder used by archivers and any
//! JSON snapshots saved through [`Session::save`]. Saves are written by a background thread so
//! cyclic code never blocks on the filesystem.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use erased_serde::Serialize;
use log::{info, warn};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

use crate::time;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Format of the timestamp in session directory names, see `chrono::format::strftime`.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Period at which an idle save thread checks for exit.
const SAVE_POLL_PERIOD: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A running session.
pub struct Session {
    /// Directory of this session
    pub session_root: PathBuf,

    /// Directory archivers write into
    pub arch_root: PathBuf,

    pub log_file_path: PathBuf,

    saver: Saver
}

/// A queued save, path relative to the session root.
struct SaveJob {
    path: PathBuf,
    data: Box<dyn Serialize + Send>
}

/// Handle to the background save thread.
struct Saver {
    sender: Sender<SaveJob>,
    exit: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("The software root environment variable (HEX_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error("A session has already been started in this process ({0})")]
    CannotInitEpoch(conquer_once::TryInitError),

    #[error("Cannot start the save thread: {0}")]
    SaveThreadError(std::io::Error)
}

#[derive(Error, Debug)]
enum SaveError {
    #[error("only .json files can be saved, got {0:?}")]
    NotJson(Option<String>),

    #[error("{0}")]
    Io(std::io::Error),

    #[error("{0}")]
    Json(serde_json::Error)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start the session for `exec_name`, creating `{exec_name}_{timestamp}` inside
    /// `sessions_dir`.
    ///
    /// Only one session may be started per process since it fixes the session epoch.
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        SESSION_EPOCH
            .try_init_once(Utc::now)
            .map_err(SessionError::CannotInitEpoch)?;
        let timestamp = get_epoch()
            .map(|e| e.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default();

        let session_root = crate::host::get_hex_sw_root()
            .map_err(|_| SessionError::SwRootNotSet)?
            .join(sessions_dir)
            .join(format!("{}_{}", exec_name, timestamp));
        let arch_root = session_root.join("arch");

        fs::create_dir_all(&arch_root).map_err(SessionError::CannotCreateDir)?;

        Ok(Session {
            log_file_path: session_root.join(format!("{}.log", exec_name)),
            saver: Saver::spawn(session_root.clone())?,
            session_root,
            arch_root
        })
    }

    /// Queue `data` to be written as pretty JSON to `path`, relative to the session root.
    ///
    /// Failures are logged by the save thread.
    pub fn save<P: AsRef<Path>, T: Serialize + Send + 'static>(&self, path: P, data: T) {
        let job = SaveJob {
            path: path.as_ref().to_path_buf(),
            data: Box::new(data)
        };

        if self.saver.sender.send(job).is_err() {
            warn!("Save thread has stopped, {:?} not saved", path.as_ref());
        }
    }

    /// End the session once every queued save has been written.
    pub fn exit(mut self) {
        info!("Waiting for pending saves");
        self.saver.join();
        info!("Session ended");
    }
}

impl Saver {
    fn spawn(session_root: PathBuf) -> Result<Self, SessionError> {
        let (sender, receiver) = mpsc::channel();
        let exit = Arc::new(AtomicBool::new(false));

        let thread_exit = exit.clone();
        let handle = thread::Builder::new()
            .name("session_save".into())
            .spawn(move || run_saver(&session_root, &receiver, &thread_exit))
            .map_err(SessionError::SaveThreadError)?;

        Ok(Self {
            sender,
            exit,
            handle: Some(handle)
        })
    }

    fn join(&mut self) {
        self.exit.store(true, Ordering::Relaxed);

        if let Some(h) = self.handle.take() {
            if h.join().is_err() {
                warn!("Save thread panicked");
            }
        }
    }
}

impl Drop for Saver {
    fn drop(&mut self) {
        self.join();
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Seconds since the session started, or `NaN` if no session has been started.
pub fn get_elapsed_seconds() -> f64 {
    get_epoch()
        .and_then(|e| time::duration_to_seconds(Utc::now() - *e))
        .unwrap_or(std::f64::NAN)
}

/// The session's epoch, `None` before a session is started.
pub fn get_epoch() -> Option<&'static DateTime<Utc>> {
    SESSION_EPOCH.get()
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn run_saver(session_root: &Path, receiver: &Receiver<SaveJob>, exit: &AtomicBool) {
    loop {
        match receiver.recv_timeout(SAVE_POLL_PERIOD) {
            Ok(job) => {
                let full_path = session_root.join(&job.path);
                if let Err(e) = write_json(&full_path, &*job.data) {
                    warn!("Couldn't save {:?}: {}", full_path, e);
                }
            },
            // The queue is drained before exiting
            Err(RecvTimeoutError::Timeout) if exit.load(Ordering::Relaxed) => break,
            Err(RecvTimeoutError::Timeout) => (),
            Err(RecvTimeoutError::Disconnected) => break
        }
    }
}

fn write_json(full_path: &Path, data: &dyn Serialize) -> Result<(), SaveError> {
    match full_path.extension().and_then(|s| s.to_str()) {
        Some("json") => (),
        ext => return Err(SaveError::NotJson(ext.map(String::from)))
    }

    if let Some(parent) = full_path.parent() {
        fs::create_dir_all(parent).map_err(SaveError::Io)?;
    }

    let file = File::create(full_path).map_err(SaveError::Io)?;
    serde_json::to_writer_pretty(file, data).map_err(SaveError::Json)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
