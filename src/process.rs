//! 子プロセスのハンドルと終了ステータス。
//!
//! [`ProcessHandle`] は spawn した子プロセスを所有する。[`ProcessHandle::wait`] は
//! ハンドルを消費するので、同じプロセスを二度 wait することはない。
//! wait されずに drop されたハンドルは Drop でブロッキング reap し、ゾンビを残さない。

use std::fmt;
use std::io;

use libc::pid_t;
use tracing::{debug, warn};

// ── ExitStatus ──────────────────────────────────────────────────────

/// コマンドの終了結果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// 終了コード 0。
    Success,
    /// 0 以外の終了コード。
    Failure(i32),
    /// シグナルで終了。引数はシグナル番号。
    Signaled(i32),
}

impl ExitStatus {
    /// シェル慣習の整数ステータスから作る。0 なら [`Success`](Self::Success)。
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            Self::Success
        } else {
            Self::Failure(code)
        }
    }

    /// `waitpid` が返した raw status を解釈する。
    pub fn from_raw(raw: i32) -> Self {
        if libc::WIFEXITED(raw) {
            Self::from_code(libc::WEXITSTATUS(raw))
        } else if libc::WIFSIGNALED(raw) {
            Self::Signaled(libc::WTERMSIG(raw))
        } else {
            Self::Failure(1)
        }
    }

    /// シェル慣習の整数ステータス。シグナル終了は 128 + シグナル番号。
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure(code) => code,
            Self::Signaled(sig) => 128 + sig,
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "exit status 0"),
            Self::Failure(code) => write!(f, "exit status {code}"),
            Self::Signaled(sig) => write!(f, "killed by signal {sig}"),
        }
    }
}

// ── ProcessHandle ───────────────────────────────────────────────────

/// spawn 済みの子プロセス。
pub struct ProcessHandle {
    /// wait 済みなら `None`。
    pid: Option<pid_t>,
    /// ログ用のコマンド名。
    command: String,
}

impl ProcessHandle {
    pub(crate) fn new(pid: pid_t, command: String) -> Self {
        Self {
            pid: Some(pid),
            command,
        }
    }

    /// 子プロセスの PID。
    pub fn pid(&self) -> pid_t {
        self.pid.unwrap_or(0)
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// 子プロセスの終了を待ち、終了ステータスを返す。
    pub fn wait(mut self) -> io::Result<ExitStatus> {
        match self.pid.take() {
            Some(pid) => {
                let status = wait_pid(pid)?;
                debug!(pid, command = %self.command, %status, "child exited");
                Ok(status)
            }
            None => Err(io::Error::new(io::ErrorKind::Other, "process already waited")),
        }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if let Some(pid) = self.pid.take() {
            if let Err(e) = wait_pid(pid) {
                warn!(pid, command = %self.command, error = %e, "failed to reap child");
            }
        }
    }
}

/// `waitpid(pid, 0)` を EINTR で再試行しながら呼ぶ。
fn wait_pid(pid: pid_t) -> io::Result<ExitStatus> {
    loop {
        let mut raw_status: i32 = 0;
        let ret = unsafe { libc::waitpid(pid, &mut raw_status, 0) };
        if ret == pid {
            return Ok(ExitStatus::from_raw(raw_status));
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}
