//! トークナイザ: 入力行を空白区切りのワード列に分割する。
//!
//! クォート・エスケープは扱わない。区切り文字はスペース、タブ、`\r`、`\n`、BEL (`\x07`)。
//! 連続する区切り文字は 1 つとして扱うため、空トークンは生成されない。

use tracing::debug;

/// トークンの区切り文字。
const DELIMITERS: &[char] = &[' ', '\t', '\r', '\n', '\x07'];

/// 入力行をトークン列に分割する。空行・空白のみの行は空ベクタを返す。
pub fn tokenize(line: &str) -> Vec<String> {
    let tokens: Vec<String> = line
        .split(DELIMITERS)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    debug!(?tokens, "tokenized");
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_words() {
        assert_eq!(tokenize("echo hello world"), vec!["echo", "hello", "world"]);
    }

    #[test]
    fn collapses_mixed_delimiters() {
        assert_eq!(
            tokenize("  ls\t-l \r\n"),
            vec!["ls", "-l"],
        );
    }

    #[test]
    fn bell_is_a_delimiter() {
        assert_eq!(tokenize("a\x07b"), vec!["a", "b"]);
    }

    #[test]
    fn empty_and_blank_lines() {
        assert!(tokenize("").is_empty());
        assert!(tokenize(" \t \n").is_empty());
    }

    #[test]
    fn operators_are_plain_tokens() {
        assert_eq!(tokenize("ls > out.txt"), vec!["ls", ">", "out.txt"]);
        // 空白で区切られていない演算子は分割しない
        assert_eq!(tokenize("ls>out.txt"), vec!["ls>out.txt"]);
    }

    #[test]
    fn quotes_are_not_interpreted() {
        assert_eq!(tokenize("echo \"a b\""), vec!["echo", "\"a", "b\""]);
    }
}
