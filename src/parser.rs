//! パーサー: トークン列からコマンド（リダイレクト付き）またはパイプラインを組み立てる。
//!
//! - [`split_pipeline`]: 最初の `|` でトークン列を producer / consumer に分割する
//! - [`resolve_redirection`]: `>` / `>>` / `<` とそのターゲットを argv から取り除き、
//!   [`Redirection`] として取り出す
//!
//! パイプラインとリダイレクトは組み合わせない。パイプラインの各コマンドの argv は
//! トークンをそのまま使う。

use thiserror::Error;
use tracing::{debug, warn};

// ── AST ─────────────────────────────────────────────────────────────

/// 単一コマンド。引数リストと高々 1 つのリダイレクト指定を持つ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// `argv[0]` がコマンド名。
    pub argv: Vec<String>,
    pub redirection: Option<Redirection>,
}

impl Command {
    /// リダイレクトなしのコマンドを作る。
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            redirection: None,
        }
    }

    /// コマンド名（`argv[0]`）。argv が空なら `None`。
    pub fn name(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }
}

/// ファイルリダイレクト指定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirection {
    /// `>` — stdout を作成/上書き
    Truncate(String),
    /// `>>` — stdout を作成/追記
    Append(String),
    /// `<` — stdin を既存ファイルから読み取り
    Read(String),
}

impl Redirection {
    /// リダイレクト先のパス。
    pub fn path(&self) -> &str {
        match self {
            Self::Truncate(p) | Self::Append(p) | Self::Read(p) => p,
        }
    }

    /// 演算子トークンとターゲットから組み立てる。演算子でなければ `None`。
    fn from_operator(op: &str, target: String) -> Option<Self> {
        match op {
            ">" => Some(Self::Truncate(target)),
            ">>" => Some(Self::Append(target)),
            "<" => Some(Self::Read(target)),
            _ => None,
        }
    }
}

/// 2 段パイプライン。`producer` の stdout が `consumer` の stdin に接続される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub producer: Command,
    pub consumer: Command,
}

// ── Error ───────────────────────────────────────────────────────────

/// パース時に発生しうるエラー。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// リダイレクト演算子の後にターゲットファイル名がない。引数は演算子。
    #[error("syntax error: missing redirect target after `{0}`")]
    MissingRedirectionTarget(String),
    /// `|` の前後にコマンドがない。
    #[error("syntax error near unexpected token `|`")]
    EmptyPipelineSegment,
}

fn is_redirect_operator(token: &str) -> bool {
    matches!(token, ">" | ">>" | "<")
}

// ── Redirection resolver ────────────────────────────────────────────

/// トークン列からリダイレクトを取り除き、[`Command`] を組み立てる。
///
/// 左から順に走査し、演算子を見つけたら次のトークンをターゲットとして取り出す。
/// 最初の一致で止まらないため、複数のリダイレクトがあれば全ての演算子とターゲットが
/// argv から除かれ、有効になるのは最後のものだけ。
pub fn resolve_redirection(tokens: Vec<String>) -> Result<Command, ParseError> {
    let mut argv = Vec::with_capacity(tokens.len());
    let mut redirection = None;
    let mut seen = 0usize;

    let mut iter = tokens.into_iter();
    while let Some(token) = iter.next() {
        if !is_redirect_operator(&token) {
            argv.push(token);
            continue;
        }
        let target = iter
            .next()
            .ok_or_else(|| ParseError::MissingRedirectionTarget(token.clone()))?;
        redirection = Redirection::from_operator(&token, target);
        seen += 1;
    }

    if seen > 1 {
        warn!(count = seen, active = ?redirection, "multiple redirections, only the last one applies");
    }
    debug!(?argv, ?redirection, "resolved command");

    Ok(Command { argv, redirection })
}

// ── Pipeline splitter ───────────────────────────────────────────────

/// 最初の `|` でトークン列を分割する。`|` がなければ `None`。
///
/// 2 つ目以降の `|` は分割せず、consumer の argv にそのまま残る。
/// 空の側（`| wc` や `ls |`）はここでは検出せず、executor が起動前に拒否する。
pub fn split_pipeline(tokens: &[String]) -> Option<Pipeline> {
    let pos = tokens.iter().position(|t| t == "|")?;
    let producer = Command::new(tokens[..pos].to_vec());
    let consumer = Command::new(tokens[pos + 1..].to_vec());
    debug!(producer = ?producer.argv, consumer = ?consumer.argv, "pipeline detected");
    Some(Pipeline { producer, consumer })
}
