//! プロンプト文字列 `<user>@<host> <cwd> > ` の組み立て。

use std::env;
use std::path::Path;

/// 指定ディレクトリを cwd としてプロンプトを組み立てる。
pub fn render(cwd: &Path) -> String {
    let user = env::var("USER").unwrap_or_else(|_| "user".to_string());
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string());
    format!("{}@{} {} > ", user, host, cwd.display())
}

/// プロセスのカレントディレクトリでプロンプトを組み立てる。
/// cwd が取得できない（削除済みなど）場合は `?` を表示する。
pub fn current() -> String {
    match env::current_dir() {
        Ok(dir) => render(&dir),
        Err(e) => {
            tracing::warn!(error = %e, "getcwd failed");
            render(Path::new("?"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_shape() {
        let p = render(Path::new("/tmp/work"));
        assert!(p.ends_with(" /tmp/work > "));
        let (user_host, _) = p.split_once(' ').unwrap();
        assert!(user_host.contains('@'));
    }
}
