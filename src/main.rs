//! lash — 小さな対話シェル
//!
//! REPL ループ: プロンプト表示 → 1 行読み取り → トークン分割 → 実行 → ループ
//!
//! モジュール構成は [`lash`] ライブラリ側（`lib.rs`）を参照。

use std::env;
use std::io;
use std::process;

use lash::config::{self, Config, Startup};
use lash::repl;
use lash::shell::ShellState;
use tracing::{debug, error};

/// `RUST_LOG` があればそれを、なければ設定に応じたレベルで stderr にログを出す。
fn init_logging(config: &Config) {
    let filter = env::var("RUST_LOG").unwrap_or_else(|_| config.default_log_filter().to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .compact()
        .init();
}

fn main() {
    let debug_env = env::var(config::DEBUG_ENV).ok();
    let config = match Config::parse(env::args().skip(1), debug_env.as_deref()) {
        Ok(Startup::Run(config)) => config,
        Ok(Startup::Help) => {
            print!("{}", config::usage());
            return;
        }
        Ok(Startup::Version) => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            return;
        }
        Err(e) => {
            eprintln!("lash: {}", e);
            eprint!("{}", config::usage());
            process::exit(2);
        }
    };

    init_logging(&config);
    debug!(?config, "starting");

    let mut shell = ShellState::new();
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();

    match repl::run(&mut shell, &mut input, &mut out) {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!(error = %e, "fatal");
            eprintln!("lash: {}", e);
            process::exit(1);
        }
    }
}
