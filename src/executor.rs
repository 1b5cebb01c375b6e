//! コマンド実行: ディスパッチ、外部コマンド起動、2 段パイプライン。
//!
//! - [`execute`]: 1 行分のトークン列を実行する。パイプライン判定 → リダイレクト解決 →
//!   ビルトイン or 外部コマンドの順にディスパッチする
//! - [`launch`]: 外部コマンドを 1 つ起動して終了を待つ。リダイレクト先ファイルは
//!   このコマンドの実行中だけ開かれ、戻る前に必ず閉じられる
//! - [`run_pipeline`]: パイプで producer と consumer を接続し、両方の終了を待つ
//!
//! リダイレクトもパイプも子プロセス側の file actions で付け替えるため、
//! シェル自身の stdin/stdout は常に元のまま。

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use tracing::{debug, warn};

use crate::builtins::{self, BuiltinHandler};
use crate::error::{Result, ShellError};
use crate::parser::{self, Command, ParseError, Pipeline, Redirection};
use crate::process::{ExitStatus, ProcessHandle};
use crate::shell::ShellState;
use crate::spawn::{self, StreamBindings};

/// 1 行分のトークン列を実行し、終了ステータスを返す。
///
/// ディスパッチ:
/// 1. `|` を含む → [`run_pipeline`]
/// 2. リダイレクトを解決し、コマンド名がビルトインなら fork なしで実行
/// 3. それ以外 → [`launch`]
pub fn execute(shell: &mut ShellState, tokens: Vec<String>) -> Result<ExitStatus> {
    if tokens.is_empty() {
        return Ok(shell.last_status);
    }

    if let Some(pipeline) = parser::split_pipeline(&tokens) {
        return run_pipeline(&pipeline);
    }

    let cmd = parser::resolve_redirection(tokens)?;
    let Some(name) = cmd.name() else {
        // `> file` のようにコマンドがない場合はファイルを開くだけ
        if let Some(redirection) = &cmd.redirection {
            open_redirection(redirection)?;
        }
        return Ok(ExitStatus::Success);
    };

    if let Some(handler) = builtins::lookup(name) {
        return execute_builtin(shell, handler, &cmd);
    }

    launch(&cmd)
}

// ── ビルトイン ──────────────────────────────────────────────────────

/// ビルトインをシェルのプロセス内で実行する。
///
/// `>` / `>>` があればファイルを開いて出力先にする。`<` はファイルの存在だけ確認する。
fn execute_builtin(shell: &mut ShellState, handler: BuiltinHandler, cmd: &Command) -> Result<ExitStatus> {
    debug!(argv = ?cmd.argv, "builtin");
    match &cmd.redirection {
        Some(redirection @ Redirection::Read(_)) => {
            open_redirection(redirection)?;
        }
        Some(redirection) => {
            let mut file = open_redirection(redirection)?;
            return Ok(handler(shell, cmd, &mut file));
        }
        None => {}
    }

    let mut stdout = io::stdout();
    let status = handler(shell, cmd, &mut stdout);
    if let Err(e) = stdout.flush() {
        warn!(error = %e, "failed to flush stdout");
    }
    Ok(status)
}

// ── 外部コマンド ────────────────────────────────────────────────────

/// リダイレクト先ファイルをモードに応じて開く。
///
/// - `Truncate`: 作成 or 切り詰め
/// - `Append`: 作成 or 追記
/// - `Read`: 既存ファイルのみ（なければ `NotFound`）
fn open_redirection(redirection: &Redirection) -> Result<File> {
    let path = redirection.path();
    let result = match redirection {
        Redirection::Truncate(_) => OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o644)
            .open(path),
        Redirection::Append(_) => OpenOptions::new()
            .append(true)
            .create(true)
            .mode(0o644)
            .open(path),
        Redirection::Read(_) => File::open(path),
    };
    debug!(?redirection, ok = result.is_ok(), "open redirection target");
    result.map_err(|source| ShellError::Redirection {
        path: path.to_string(),
        source,
    })
}

/// 外部コマンドを起動し、終了を待つ。
///
/// リダイレクト先を開けなければ子プロセスは起動しない。開いたファイルはこの関数の
/// スコープで所有され、spawn 失敗・wait 失敗を含むすべての経路で閉じられる。
pub fn launch(cmd: &Command) -> Result<ExitStatus> {
    let file = cmd.redirection.as_ref().map(open_redirection).transpose()?;

    let mut bindings = StreamBindings::inherit();
    if let (Some(redirection), Some(file)) = (&cmd.redirection, &file) {
        match redirection {
            Redirection::Read(_) => bindings.stdin = Some(file.as_raw_fd()),
            Redirection::Truncate(_) | Redirection::Append(_) => {
                bindings.stdout = Some(file.as_raw_fd())
            }
        }
    }

    let child = spawn::spawn(&cmd.argv, &bindings)?;
    let status = child.wait().map_err(ShellError::Wait);
    drop(file);
    status
}

// ── パイプライン ────────────────────────────────────────────────────

/// close-on-exec 付きの匿名パイプを作る。戻り値は `(read, write)`。
fn create_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut fds: [RawFd; 2] = [-1; 2];
    if raw_pipe(&mut fds) != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: pipe が成功したので両 fd は開いており、所有者は他にいない
    let pair = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    Ok(pair)
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
fn raw_pipe(fds: &mut [RawFd; 2]) -> i32 {
    unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) }
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
)))]
fn raw_pipe(fds: &mut [RawFd; 2]) -> i32 {
    let ret = unsafe { libc::pipe(fds.as_mut_ptr()) };
    if ret == 0 {
        for &fd in fds.iter() {
            unsafe {
                libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC);
            }
        }
    }
    ret
}

/// パイプラインの 2 つの子プロセス。
pub(crate) struct PipelineChildren {
    pub producer: ProcessHandle,
    pub consumer: ProcessHandle,
}

/// パイプを作り、producer と consumer を起動する。
///
/// fd の扱い:
/// - producer: `dup2(write, 1)` 後に write を閉じ、read も閉じる
/// - consumer: `dup2(read, 0)` 後に read を閉じる。write は consumer の spawn 前に
///   シェル側で閉じているので継承されない
/// - シェル: 両端とも戻る前に閉じる
///
/// consumer の起動に失敗した場合は read 端を閉じてから producer を reap する
/// （producer は EPIPE/SIGPIPE で終了するのでブロックしない）。
pub(crate) fn spawn_pipeline(pipeline: &Pipeline) -> Result<PipelineChildren> {
    if pipeline.producer.argv.is_empty() || pipeline.consumer.argv.is_empty() {
        return Err(ParseError::EmptyPipelineSegment.into());
    }
    if pipeline.consumer.argv.iter().any(|t| t == "|") {
        warn!(
            consumer = ?pipeline.consumer.argv,
            "only two-stage pipelines are supported, extra `|` passed as an argument"
        );
    }

    let (read_end, write_end) = create_pipe().map_err(ShellError::Pipe)?;
    let read_fd = read_end.as_raw_fd();
    let write_fd = write_end.as_raw_fd();
    debug!(read_fd, write_fd, "pipe created");

    let producer = spawn::spawn(
        &pipeline.producer.argv,
        &StreamBindings {
            stdin: None,
            stdout: Some(write_fd),
            close: vec![read_fd],
        },
    )?;
    drop(write_end);

    let consumer = spawn::spawn(
        &pipeline.consumer.argv,
        &StreamBindings {
            stdin: Some(read_fd),
            stdout: None,
            close: Vec::new(),
        },
    );
    drop(read_end);
    let consumer = consumer?;

    Ok(PipelineChildren { producer, consumer })
}

/// 2 つの子プロセスを両方 wait する。片方の wait が失敗しても、もう片方は必ず wait する。
/// 戻り値は consumer の終了ステータス。
pub(crate) fn wait_pipeline(children: PipelineChildren) -> Result<ExitStatus> {
    let producer = children.producer.wait();
    let consumer = children.consumer.wait();
    let producer = producer.map_err(ShellError::Wait)?;
    let consumer = consumer.map_err(ShellError::Wait)?;
    debug!(%producer, %consumer, "pipeline finished");
    Ok(consumer)
}

/// 2 段パイプラインを実行し、両方の子プロセスの終了を待ってから consumer のステータスを返す。
pub fn run_pipeline(pipeline: &Pipeline) -> Result<ExitStatus> {
    let children = spawn_pipeline(pipeline)?;
    wait_pipeline(children)
}
