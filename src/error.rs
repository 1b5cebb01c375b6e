//! シェル全体のエラー型。
//!
//! `Input` 以外はすべて回復可能で、REPL はメッセージを表示して次のプロンプトへ戻る。

use std::io;

use thiserror::Error;

use crate::parser::ParseError;
use crate::spawn::SpawnError;

#[derive(Debug, Error)]
pub enum ShellError {
    /// 構文エラー（リダイレクト先なし、空のパイプライン要素）。
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// コマンドの起動に失敗（command not found を含む）。
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    /// リダイレクト先を開けなかった。子プロセスは起動していない。
    #[error("{path}: {source}")]
    Redirection {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("pipe: {0}")]
    Pipe(#[source] io::Error),

    #[error("wait: {0}")]
    Wait(#[source] io::Error),

    /// 入力ストリームの読み取り失敗（EOF 以外）。致命的。
    #[error("read error: {0}")]
    Input(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, ShellError>;

impl ShellError {
    /// エラーに対応する終了ステータス。
    pub fn exit_status(&self) -> i32 {
        match self {
            Self::Parse(_) => 2,
            Self::Spawn(e) => e.exit_status(),
            Self::Redirection { .. } | Self::Pipe(_) | Self::Wait(_) | Self::Input(_) => 1,
        }
    }

    /// シェルを終了させるべきエラーか。
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Input(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_status_and_message() {
        let e = ShellError::from(ParseError::MissingRedirectionTarget(">".into()));
        assert_eq!(e.exit_status(), 2);
        assert!(!e.is_fatal());
        assert_eq!(e.to_string(), "syntax error: missing redirect target after `>`");
    }

    #[test]
    fn redirection_error_message() {
        let e = ShellError::Redirection {
            path: "in.txt".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(e.exit_status(), 1);
        assert!(e.to_string().starts_with("in.txt: "));
    }

    #[test]
    fn input_error_is_fatal() {
        let e = ShellError::Input(io::Error::from(io::ErrorKind::InvalidData));
        assert!(e.is_fatal());
    }
}
