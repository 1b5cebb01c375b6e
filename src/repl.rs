//! REPL ループ: プロンプト表示 → 1 行読み取り → トークン分割 → 実行 → ループ。
//!
//! 終了条件は入力の EOF（終了コード 0）か、ビルトインによる終了要求。
//! EOF 以外の読み取り失敗は [`ShellError::Input`] として呼び出し側に返す。

use std::io::{self, BufRead, Write};

use tracing::{debug, warn};

use crate::error::ShellError;
use crate::executor;
use crate::process::ExitStatus;
use crate::prompt;
use crate::shell::ShellState;
use crate::tokenizer;

/// 入力が尽きるか `exit` されるまでコマンドを実行し、シェルの終了コードを返す。
///
/// プロンプトは `out` に書く。コマンド自身の出力はシェルの stdout に直接出る。
pub fn run<R: BufRead, W: Write>(
    shell: &mut ShellState,
    input: &mut R,
    out: &mut W,
) -> Result<i32, ShellError> {
    let mut buf = Vec::new();
    loop {
        if let Err(e) = write!(out, "{}", prompt::current()).and_then(|_| out.flush()) {
            warn!(error = %e, "failed to write prompt");
        }

        buf.clear();
        match input.read_until(b'\n', &mut buf) {
            Ok(0) => {
                debug!("end of input");
                // EOF 後の次の出力が同じ行に続かないように改行する
                let _ = writeln!(out);
                return Ok(0);
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ShellError::Input(e)),
        }

        let line = String::from_utf8_lossy(&buf);
        debug!(line = %line.trim_end(), "read line");

        let tokens = tokenizer::tokenize(&line);
        if tokens.is_empty() {
            continue;
        }

        match executor::execute(shell, tokens) {
            Ok(status) => shell.last_status = status,
            Err(e) => {
                eprintln!("lash: {}", e);
                shell.last_status = ExitStatus::from_code(e.exit_status());
            }
        }
        debug!(status = %shell.last_status, "command finished");

        if shell.should_exit {
            return Ok(shell.exit_code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run_script(script: &str) -> (Result<i32, ShellError>, ShellState, String) {
        let mut shell = ShellState::new();
        let mut input = Cursor::new(script.as_bytes().to_vec());
        let mut out = Vec::new();
        let result = run(&mut shell, &mut input, &mut out);
        (result, shell, String::from_utf8(out).unwrap())
    }

    /// 常に読み取りエラーを返す入力。
    struct BrokenInput;

    impl io::Read for BrokenInput {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "device gone"))
        }
    }

    #[test]
    fn eof_exits_cleanly() {
        let (result, shell, out) = run_script("");
        assert_eq!(result.unwrap(), 0);
        assert!(!shell.should_exit);
        assert_eq!(out.matches(" > ").count(), 1);
    }

    #[test]
    fn blank_lines_are_noops() {
        let (result, shell, out) = run_script("\n   \n\t\n");
        assert_eq!(result.unwrap(), 0);
        assert_eq!(shell.last_status, ExitStatus::Success);
        // 3 行 + EOF で 4 回プロンプトが出る
        assert_eq!(out.matches(" > ").count(), 4);
    }

    #[test]
    fn exit_stops_the_loop() {
        let (result, _, out) = run_script("exit 4\ntrue\n");
        assert_eq!(result.unwrap(), 4);
        // `true` は読まれない
        assert_eq!(out.matches(" > ").count(), 1);
    }

    #[test]
    fn errors_are_recovered() {
        let (result, shell, _) = run_script("ls >\nlash-test-no-such-command-xyz\n");
        assert_eq!(result.unwrap(), 0);
        assert_eq!(shell.last_status, ExitStatus::Failure(127));
    }

    #[test]
    fn last_status_is_tracked() {
        let (_, shell, _) = run_script("false\n");
        assert_eq!(shell.last_status, ExitStatus::Failure(1));
        let (result, _, _) = run_script("false\nexit\n");
        assert_eq!(result.unwrap(), 1);
    }

    #[test]
    fn read_error_is_fatal() {
        let mut shell = ShellState::new();
        let mut input = io::BufReader::new(BrokenInput);
        let mut out = Vec::new();
        let err = run(&mut shell, &mut input, &mut out).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn invalid_utf8_is_not_fatal() {
        let mut shell = ShellState::new();
        let mut input = Cursor::new(b"true \xff\n".to_vec());
        let mut out = Vec::new();
        assert_eq!(run(&mut shell, &mut input, &mut out).unwrap(), 0);
    }
}
