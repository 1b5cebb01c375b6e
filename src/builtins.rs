//! ビルトインコマンドの実装。
//!
//! ビルトインは fork/exec を経由せずシェルのプロセス内で直接実行される。
//! コマンド名から [`BuiltinHandler`] への対応は固定の静的テーブル [`BUILTINS`] で、
//! 実行時の登録はない。[`lookup`] が `Some(handler)` を返せばビルトイン、
//! `None` なら外部コマンドとして executor に委ねる。
//!
//! ループの継続/終了はハンドラの戻り値ではなく [`ShellState::should_exit`] で伝える。

use std::env;
use std::io::Write;
use std::path::Path;

use crate::parser::Command;
use crate::process::ExitStatus;
use crate::shell::ShellState;

/// ビルトインのハンドラ。出力は `out`（リダイレクト時はファイル）に書く。
pub type BuiltinHandler = fn(&mut ShellState, &Command, &mut dyn Write) -> ExitStatus;

/// コマンド名とハンドラの対応表。
pub static BUILTINS: &[(&str, BuiltinHandler)] = &[
    ("cd", builtin_cd),
    ("pwd", builtin_pwd),
    ("help", builtin_help),
    ("exit", builtin_exit),
];

/// コマンド名に完全一致（大文字小文字を区別）するビルトインを探す。
pub fn lookup(name: &str) -> Option<BuiltinHandler> {
    BUILTINS
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|&(_, handler)| handler)
}

pub fn is_builtin(name: &str) -> bool {
    lookup(name).is_some()
}

/// `exit [N]` — シェルを終了する。N が指定されればそのコードで、省略時は直前のステータスで終了。
fn builtin_exit(shell: &mut ShellState, cmd: &Command, _out: &mut dyn Write) -> ExitStatus {
    let code = match cmd.argv.get(1) {
        Some(arg) => arg.parse::<i32>().unwrap_or_else(|_| {
            eprintln!("lash: exit: {}: numeric argument required", arg);
            2
        }),
        None => shell.last_status.code(),
    };
    shell.request_exit(code);
    ExitStatus::from_code(code)
}

/// `cd [dir]` — カレントディレクトリを変更する。引数省略時は `$HOME` に移動。
fn builtin_cd(_shell: &mut ShellState, cmd: &Command, _out: &mut dyn Write) -> ExitStatus {
    let target = match cmd.argv.get(1) {
        Some(dir) => dir.clone(),
        None => match env::var("HOME") {
            Ok(home) => home,
            Err(_) => {
                eprintln!("lash: cd: HOME not set");
                return ExitStatus::Failure(1);
            }
        },
    };

    if let Err(e) = env::set_current_dir(Path::new(&target)) {
        eprintln!("lash: cd: {}: {}", target, e);
        ExitStatus::Failure(1)
    } else {
        ExitStatus::Success
    }
}

/// `pwd` — カレントディレクトリを表示する。
fn builtin_pwd(_shell: &mut ShellState, _cmd: &Command, out: &mut dyn Write) -> ExitStatus {
    let result = env::current_dir().and_then(|dir| writeln!(out, "{}", dir.display()));
    match result {
        Ok(()) => ExitStatus::Success,
        Err(e) => {
            eprintln!("lash: pwd: {}", e);
            ExitStatus::Failure(1)
        }
    }
}

/// `help` — ビルトイン一覧と対応演算子を表示する。
fn builtin_help(_shell: &mut ShellState, _cmd: &Command, out: &mut dyn Write) -> ExitStatus {
    let mut text = String::from("lash: a small shell\n\nBuiltin commands:\n");
    for (name, _) in BUILTINS {
        text.push_str("  ");
        text.push_str(name);
        text.push('\n');
    }
    text.push_str("\nOperators: `cmd > file`, `cmd >> file`, `cmd < file`, `cmd1 | cmd2`\n");
    match out.write_all(text.as_bytes()) {
        Ok(()) => ExitStatus::Success,
        Err(e) => {
            eprintln!("lash: help: {}", e);
            ExitStatus::Failure(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(args: &[&str]) -> Command {
        Command::new(args.iter().map(|s| s.to_string()).collect())
    }

    fn run(shell: &mut ShellState, args: &[&str]) -> (ExitStatus, String) {
        let handler = lookup(args[0]).unwrap();
        let mut out = Vec::new();
        let status = handler(shell, &cmd(args), &mut out);
        (status, String::from_utf8(out).unwrap())
    }

    #[test]
    fn lookup_is_exact_and_case_sensitive() {
        assert!(lookup("cd").is_some());
        assert!(lookup("exit").is_some());
        assert!(lookup("CD").is_none());
        assert!(lookup("cd ").is_none());
        assert!(lookup("ls").is_none());
        assert!(!is_builtin("echo"));
    }

    #[test]
    fn exit_without_argument_uses_last_status() {
        let mut shell = ShellState::new();
        shell.last_status = ExitStatus::Failure(3);
        let (status, _) = run(&mut shell, &["exit"]);
        assert!(shell.should_exit);
        assert_eq!(shell.exit_code, 3);
        assert_eq!(status, ExitStatus::Failure(3));
    }

    #[test]
    fn exit_with_code() {
        let mut shell = ShellState::new();
        let (status, _) = run(&mut shell, &["exit", "0"]);
        assert!(shell.should_exit);
        assert_eq!(shell.exit_code, 0);
        assert_eq!(status, ExitStatus::Success);
    }

    #[test]
    fn exit_with_bad_argument() {
        let mut shell = ShellState::new();
        run(&mut shell, &["exit", "abc"]);
        assert!(shell.should_exit);
        assert_eq!(shell.exit_code, 2);
    }

    #[test]
    fn cd_to_missing_directory_fails() {
        let mut shell = ShellState::new();
        let before = env::current_dir().unwrap();
        let (status, _) = run(&mut shell, &["cd", "/lash-test/no/such/dir"]);
        assert_eq!(status, ExitStatus::Failure(1));
        assert_eq!(env::current_dir().unwrap(), before);
        assert!(!shell.should_exit);
    }

    #[test]
    fn pwd_writes_current_dir() {
        let mut shell = ShellState::new();
        let (status, out) = run(&mut shell, &["pwd"]);
        assert_eq!(status, ExitStatus::Success);
        assert_eq!(out.trim_end(), env::current_dir().unwrap().display().to_string());
    }

    #[test]
    fn help_lists_every_builtin() {
        let mut shell = ShellState::new();
        let (status, out) = run(&mut shell, &["help"]);
        assert_eq!(status, ExitStatus::Success);
        for (name, _) in BUILTINS {
            assert!(out.contains(name));
        }
    }
}
