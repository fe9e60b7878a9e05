//! Wildcard text matching used by `glob` and `like` constraints.
//!
//! Glob patterns use `*` for any sequence, `?` for a single character and `\`
//! to escape the next character. Like patterns use SQL `%` and `_` and compare
//! ASCII letters case-insensitively. Neither treats `/` as a separator, and
//! brackets or braces are always literal. Both compile to a [`globset`]
//! matcher.

use globset::GlobBuilder;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Any,
    One,
    Char(char),
}

fn glob_tokens(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(char) = chars.next() {
        tokens.push(match char {
            '*' => Token::Any,
            '?' => Token::One,
            '\\' => Token::Char(chars.next().unwrap_or('\\')),
            other => Token::Char(other),
        });
    }
    tokens
}

fn like_tokens(pattern: &str) -> Vec<Token> {
    pattern
        .chars()
        .map(|char| match char {
            '%' => Token::Any,
            '_' => Token::One,
            other => Token::Char(other),
        })
        .collect()
}

/// Render tokens as a globset pattern. Every literal is escaped and runs of
/// `Any` collapse into one `*`, so `**` never takes its recursive meaning.
fn to_globset(tokens: &[Token]) -> String {
    let mut pattern = String::with_capacity(tokens.len() * 2);
    for (index, token) in tokens.iter().enumerate() {
        match token {
            Token::Any if index > 0 && tokens[index - 1] == Token::Any => {}
            Token::Any => pattern.push('*'),
            Token::One => pattern.push('?'),
            Token::Char(char) => {
                pattern.push('\\');
                pattern.push(*char);
            }
        }
    }
    pattern
}

fn is_match(text: &str, tokens: &[Token]) -> bool {
    let pattern = to_globset(tokens);
    match GlobBuilder::new(&pattern)
        .literal_separator(false)
        .backslash_escape(true)
        .build()
    {
        Ok(glob) => glob.compile_matcher().is_match(text),
        Err(error) => {
            tracing::warn!(%pattern, %error, "Unusable text pattern");
            false
        }
    }
}

/// Whether `text` matches the glob `pattern`
pub fn glob(text: &str, pattern: &str) -> bool {
    is_match(text, &glob_tokens(pattern))
}

/// Whether `text` matches the SQL like `pattern`
pub fn like(text: &str, pattern: &str) -> bool {
    is_match(
        &text.to_ascii_lowercase(),
        &like_tokens(&pattern.to_ascii_lowercase()),
    )
}

/// The literal text a glob pattern matches, if it has no wildcards
pub fn glob_literal(pattern: &str) -> Option<String> {
    glob_tokens(pattern)
        .into_iter()
        .map(|token| match token {
            Token::Char(char) => Some(char),
            _ => None,
        })
        .collect()
}

/// The literal text a like pattern matches, if it has no wildcards.
///
/// Like matching ignores ASCII case, so only patterns without ASCII letters
/// pin down a single text.
pub fn like_literal(pattern: &str) -> Option<String> {
    like_tokens(pattern)
        .into_iter()
        .map(|token| match token {
            Token::Char(char) if !char.is_ascii_alphabetic() => Some(char),
            _ => None,
        })
        .collect()
}
