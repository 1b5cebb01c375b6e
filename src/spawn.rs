//! `posix_spawnp()` の安全な Rust ラッパー。
//!
//! 外部コマンドの起動はすべてこのモジュールの [`spawn`] を経由する。
//! 標準入出力の付け替えは子プロセス側の file actions（`dup2` + `close`）で行うため、
//! シェル自身の fd 0/1 は一度も書き換えられない。
//!
//! ## 構成
//!
//! | 型 | 役割 |
//! |-----|------|
//! | [`StreamBindings`] | 子プロセスの stdin/stdout に接続する fd と、子で閉じる fd |
//! | [`SpawnAttr`] | `posix_spawnattr_t` の RAII ラッパー（シグナル設定） |
//! | [`FileActions`] | `posix_spawn_file_actions_t` の RAII ラッパー（fd 操作） |
//! | [`CStringVec`] | argv 用の NULL 終端ポインタ配列 |
//! | [`spawn`] | 上記を組み合わせて `posix_spawnp` を呼ぶ公開関数 |

use std::ffi::CString;
use std::fmt;
use std::os::unix::io::RawFd;

use tracing::debug;

use crate::process::ProcessHandle;

// ── エラー型 ──────────────────────────────────────────────────────

/// spawn 失敗の分類。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnErrorKind {
    /// ENOENT — PATH 上にコマンドがない。
    NotFound,
    /// EACCES — 実行権限がない。
    PermissionDenied,
    /// argv に NUL バイトが含まれる。
    InvalidArgument,
    /// fork/exec 相当のその他の失敗。
    Other,
}

/// `posix_spawnp` の失敗を表すエラー。
#[derive(Debug)]
pub struct SpawnError {
    /// errno 値。
    pub errno: i32,
    /// コマンド名（エラーメッセージ用）。
    pub command: String,
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.command, self.message())
    }
}

impl std::error::Error for SpawnError {}

impl SpawnError {
    pub fn kind(&self) -> SpawnErrorKind {
        match self.errno {
            libc::ENOENT => SpawnErrorKind::NotFound,
            libc::EACCES => SpawnErrorKind::PermissionDenied,
            libc::EINVAL => SpawnErrorKind::InvalidArgument,
            _ => SpawnErrorKind::Other,
        }
    }

    fn message(&self) -> String {
        match self.kind() {
            SpawnErrorKind::NotFound => "command not found".to_string(),
            SpawnErrorKind::PermissionDenied => "permission denied".to_string(),
            SpawnErrorKind::InvalidArgument => "invalid argument".to_string(),
            SpawnErrorKind::Other => format!(
                "spawn failed: {}",
                std::io::Error::from_raw_os_error(self.errno)
            ),
        }
    }

    /// エラーに対応する終了ステータスを返す。
    /// 127 = command not found, 126 = permission denied, 1 = その他。
    pub fn exit_status(&self) -> i32 {
        match self.kind() {
            SpawnErrorKind::NotFound => 127,
            SpawnErrorKind::PermissionDenied => 126,
            _ => 1,
        }
    }
}

// ── StreamBindings ────────────────────────────────────────────────

/// 子プロセスの標準ストリームの接続先。
///
/// `None` のストリームはシェルから継承する。
/// fd の所有権は呼び出し側に残り、spawn 後に親側で close する責任がある。
#[derive(Debug, Default, Clone)]
pub struct StreamBindings {
    /// stdin に接続する fd。
    pub stdin: Option<RawFd>,
    /// stdout に接続する fd。
    pub stdout: Option<RawFd>,
    /// 子プロセスで閉じる fd（パイプの未使用端など）。
    pub close: Vec<RawFd>,
}

impl StreamBindings {
    /// すべて継承。
    pub fn inherit() -> Self {
        Self::default()
    }
}

// ── SpawnAttr ─────────────────────────────────────────────────────

/// `posix_spawnattr_t` の RAII ラッパー。Drop で自動 destroy。
struct SpawnAttr {
    inner: libc::posix_spawnattr_t,
}

impl SpawnAttr {
    fn new() -> Self {
        unsafe {
            let mut attr: libc::posix_spawnattr_t = std::mem::zeroed();
            libc::posix_spawnattr_init(&mut attr);
            Self { inner: attr }
        }
    }

    /// SIGPIPE を `SIG_DFL` に戻す。
    ///
    /// Rust ランタイムはシェル自身の SIGPIPE を無視に設定しており、無視設定は exec を
    /// 越えて継承される。`yes | head` の producer が EPIPE ではなく SIGPIPE で静かに
    /// 終了するよう、子プロセスではデフォルトに戻す。
    fn set_sigdefault(&mut self) {
        unsafe {
            let mut flags: libc::c_short = 0;
            libc::posix_spawnattr_getflags(&self.inner, &mut flags);
            flags |= libc::POSIX_SPAWN_SETSIGDEF as libc::c_short;
            libc::posix_spawnattr_setflags(&mut self.inner, flags);

            let mut sigset: libc::sigset_t = std::mem::zeroed();
            libc::sigemptyset(&mut sigset);
            libc::sigaddset(&mut sigset, libc::SIGPIPE);
            libc::posix_spawnattr_setsigdefault(&mut self.inner, &sigset);
        }
    }

    fn as_ptr(&self) -> *const libc::posix_spawnattr_t {
        &self.inner
    }
}

impl Drop for SpawnAttr {
    fn drop(&mut self) {
        unsafe {
            libc::posix_spawnattr_destroy(&mut self.inner);
        }
    }
}

// ── FileActions ───────────────────────────────────────────────────

/// `posix_spawn_file_actions_t` の RAII ラッパー。Drop で自動 destroy。
struct FileActions {
    inner: libc::posix_spawn_file_actions_t,
}

impl FileActions {
    fn new() -> Self {
        unsafe {
            let mut actions: libc::posix_spawn_file_actions_t = std::mem::zeroed();
            libc::posix_spawn_file_actions_init(&mut actions);
            Self { inner: actions }
        }
    }

    /// `dup2(fd, newfd)` アクションを追加する。
    fn add_dup2(&mut self, fd: RawFd, newfd: RawFd) {
        unsafe {
            libc::posix_spawn_file_actions_adddup2(&mut self.inner, fd, newfd);
        }
    }

    /// `close(fd)` アクションを追加する。
    fn add_close(&mut self, fd: RawFd) {
        unsafe {
            libc::posix_spawn_file_actions_addclose(&mut self.inner, fd);
        }
    }

    /// `fd` を `target` に複製し、元の fd を閉じる。
    fn bind(&mut self, fd: RawFd, target: RawFd) {
        self.add_dup2(fd, target);
        if fd != target {
            self.add_close(fd);
        }
    }

    fn from_bindings(bindings: &StreamBindings) -> Self {
        let mut actions = Self::new();
        if let Some(fd) = bindings.stdin {
            actions.bind(fd, libc::STDIN_FILENO);
        }
        if let Some(fd) = bindings.stdout {
            actions.bind(fd, libc::STDOUT_FILENO);
        }
        for &fd in &bindings.close {
            // dup2 後に既に close 済みの fd は除く
            let already_closed = bindings.stdin == Some(fd) || bindings.stdout == Some(fd);
            if !already_closed {
                actions.add_close(fd);
            }
        }
        actions
    }

    fn as_ptr(&self) -> *const libc::posix_spawn_file_actions_t {
        &self.inner
    }
}

impl Drop for FileActions {
    fn drop(&mut self) {
        unsafe {
            libc::posix_spawn_file_actions_destroy(&mut self.inner);
        }
    }
}

// ── CStringVec ────────────────────────────────────────────────────

/// argv 用の CString ベクタ。NULL 終端のポインタ配列を構築する。
struct CStringVec {
    strings: Vec<CString>,
    ptrs: Vec<*mut libc::c_char>,
}

impl CStringVec {
    /// 引数リストから構築する。NUL バイトを含む引数があれば `None`。
    fn from_args(args: &[String]) -> Option<Self> {
        let strings = args
            .iter()
            .map(|s| CString::new(s.as_bytes()).ok())
            .collect::<Option<Vec<CString>>>()?;
        let mut ptrs: Vec<*mut libc::c_char> = strings
            .iter()
            .map(|s| s.as_ptr() as *mut libc::c_char)
            .collect();
        ptrs.push(std::ptr::null_mut()); // NULL 終端
        Some(Self { strings, ptrs })
    }

    fn program(&self) -> *const libc::c_char {
        self.strings[0].as_ptr()
    }

    fn as_ptr(&self) -> *const *mut libc::c_char {
        self.ptrs.as_ptr()
    }
}

// ── spawn 関数 ────────────────────────────────────────────────────

/// `posix_spawnp` で子プロセスを起動する。
///
/// `argv[0]` は PATH から検索される。`bindings` に従って子の stdin/stdout を付け替え、
/// 不要な fd を閉じてから exec する。空の argv は呼び出し側で弾いておくこと。
pub fn spawn(argv: &[String], bindings: &StreamBindings) -> Result<ProcessHandle, SpawnError> {
    let command = argv.first().cloned().unwrap_or_default();
    let c_argv = match CStringVec::from_args(argv) {
        Some(v) if !argv.is_empty() => v,
        _ => {
            return Err(SpawnError {
                errno: libc::EINVAL,
                command,
            })
        }
    };

    let mut attr = SpawnAttr::new();
    attr.set_sigdefault();
    let actions = FileActions::from_bindings(bindings);

    // environ を継承する
    extern "C" {
        static environ: *const *mut libc::c_char;
    }

    let mut pid: libc::pid_t = 0;
    let ret = unsafe {
        libc::posix_spawnp(
            &mut pid,
            c_argv.program(),
            actions.as_ptr(),
            attr.as_ptr(),
            c_argv.as_ptr(),
            environ as *const *mut libc::c_char,
        )
    };

    if ret != 0 {
        return Err(SpawnError {
            errno: ret,
            command,
        });
    }

    debug!(pid, ?argv, ?bindings, "spawned");
    Ok(ProcessHandle::new(pid, command))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ExitStatus;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn spawn_true_succeeds() {
        let child = spawn(&argv(&["true"]), &StreamBindings::inherit()).unwrap();
        assert!(child.pid() > 0);
        assert_eq!(child.wait().unwrap(), ExitStatus::Success);
    }

    #[test]
    fn spawn_reports_exit_code() {
        let child = spawn(&argv(&["sh", "-c", "exit 7"]), &StreamBindings::inherit()).unwrap();
        assert_eq!(child.wait().unwrap(), ExitStatus::Failure(7));
    }

    #[test]
    fn spawn_missing_command() {
        let err = spawn(
            &argv(&["lash-test-no-such-command-xyz"]),
            &StreamBindings::inherit(),
        )
        .err()
        .unwrap();
        assert_eq!(err.kind(), SpawnErrorKind::NotFound);
        assert_eq!(err.exit_status(), 127);
        assert_eq!(
            err.to_string(),
            "lash-test-no-such-command-xyz: command not found"
        );
    }

    #[test]
    fn spawn_rejects_nul_and_empty() {
        let err = spawn(&argv(&["ec\0ho"]), &StreamBindings::inherit()).err().unwrap();
        assert_eq!(err.kind(), SpawnErrorKind::InvalidArgument);
        let err = spawn(&[], &StreamBindings::inherit()).err().unwrap();
        assert_eq!(err.kind(), SpawnErrorKind::InvalidArgument);
    }

    #[test]
    fn error_status_mapping() {
        let e = |errno| SpawnError {
            errno,
            command: "x".into(),
        };
        assert_eq!(e(libc::EACCES).exit_status(), 126);
        assert_eq!(e(libc::EACCES).to_string(), "x: permission denied");
        assert_eq!(e(libc::EAGAIN).exit_status(), 1);
        assert_eq!(e(libc::EAGAIN).kind(), SpawnErrorKind::Other);
    }
}
