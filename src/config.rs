//! 起動設定: コマンドライン引数と環境変数から [`Config`] を組み立てる。
//!
//! | 入力 | 効果 |
//! |------|------|
//! | `-d`, `--debug` / `LASH_DEBUG=1\|true` | デバッグログを有効にする |
//! | `-h`, `--help` | 使い方を表示して終了 |
//! | `-V`, `--version` | バージョンを表示して終了 |
//! | `RUST_LOG` | ログフィルタを直接指定（デバッグ設定より優先） |

use thiserror::Error;

/// デバッグモードを有効にする環境変数。
pub const DEBUG_ENV: &str = "LASH_DEBUG";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// 入力行・トークン・spawn・wait をログに出す。
    pub debug: bool,
}

/// 引数解析の結果。
#[derive(Debug, PartialEq, Eq)]
pub enum Startup {
    Run(Config),
    Help,
    Version,
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown option: {0}")]
    UnknownArgument(String),
}

impl Config {
    /// 引数（プログラム名を除く）と `LASH_DEBUG` の値から起動設定を作る。
    pub fn parse<I>(args: I, debug_env: Option<&str>) -> Result<Startup, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Config {
            debug: debug_env.is_some_and(is_truthy),
        };
        for arg in args {
            match arg.as_str() {
                "-d" | "--debug" => config.debug = true,
                "-h" | "--help" => return Ok(Startup::Help),
                "-V" | "--version" => return Ok(Startup::Version),
                _ => return Err(ConfigError::UnknownArgument(arg)),
            }
        }
        Ok(Startup::Run(config))
    }

    /// `RUST_LOG` がなければ使うログフィルタ。
    pub fn default_log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "warn"
        }
    }
}

fn is_truthy(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

pub fn usage() -> String {
    format!(
        "Usage: {} [OPTIONS]\n\n\
         Options:\n\
         \x20   -d, --debug      Log parsing and process events to stderr\n\
         \x20   -h, --help       Print this help\n\
         \x20   -V, --version    Print version\n\n\
         Environment:\n\
         \x20   {}       Enable debug mode (1 or true)\n\
         \x20   RUST_LOG         Log filter (error, warn, info, debug, trace)\n",
        env!("CARGO_PKG_NAME"),
        DEBUG_ENV,
    )
}
