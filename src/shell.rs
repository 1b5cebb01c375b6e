//! シェルの状態を保持するモジュール。
//!
//! ビルトインだけがこの状態を書き換える。カレントディレクトリはプロセスの cwd
//! （`std::env::set_current_dir`）をそのまま使い、子プロセスへの自動継承を活用する。

use crate::process::ExitStatus;

/// シェルの実行状態。REPL ループ全体で共有され、ビルトインに `&mut` で渡される。
#[derive(Debug)]
pub struct ShellState {
    /// 直前のコマンドの終了ステータス。`exit` のデフォルト値に使う。
    pub last_status: ExitStatus,
    /// `exit` ビルトインで true にセットされ、REPL ループを終了させる。
    pub should_exit: bool,
    /// シェル自身の終了コード。
    pub exit_code: i32,
}

impl ShellState {
    pub fn new() -> Self {
        Self {
            last_status: ExitStatus::Success,
            should_exit: false,
            exit_code: 0,
        }
    }

    /// シェルの終了を要求する。
    pub fn request_exit(&mut self, code: i32) {
        self.should_exit = true;
        self.exit_code = code;
    }
}

impl Default for ShellState {
    fn default() -> Self {
        Self::new()
    }
}
