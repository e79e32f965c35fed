//! `.env` loading for the command-line tool.
//!
//! Lines are `KEY=value`, optionally prefixed with `export`. Values may be
//! single-quoted (literal) or double-quoted (`\n`, `\t`, `\"`, `\\` escapes).
//! A `#` starts a comment outside quotes.

use std::fs;
use std::path::Path;

/// Load `path` into the process environment.
///
/// Variables already present in the environment are left untouched.
/// Returns how many variables were set.
pub fn load(path: &Path) -> Result<usize, String> {
    let contents = fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    let mut applied = 0;
    for (index, line) in contents.lines().enumerate() {
        let Some((key, value)) = parse_line(line).map_err(|e| format!("{}:{}: {}", path.display(), index + 1, e))?
        else {
            continue;
        };
        if std::env::var_os(&key).is_none() {
            // Updating process-level environment variables is unsafe on some targets.
            unsafe {
                std::env::set_var(&key, value);
            }
            applied += 1;
        }
    }
    Ok(applied)
}

pub fn parse_line(line: &str) -> Result<Option<(String, String)>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let line = line.strip_prefix("export ").map(str::trim_start).unwrap_or(line);

    let (key, raw) = line.split_once('=').ok_or_else(|| "missing '=' in assignment".to_string())?;
    let key = key.trim();
    if key.is_empty() {
        return Err("variable name cannot be empty".to_string());
    }
    if key.contains(char::is_whitespace) {
        return Err(format!("variable name contains whitespace: {}", key));
    }

    Ok(Some((key.to_string(), parse_value(raw.trim())?)))
}

fn parse_value(raw: &str) -> Result<String, String> {
    let (value, rest) = if let Some(body) = raw.strip_prefix('\'') {
        let end = body.find('\'').ok_or_else(|| "unterminated single-quoted value".to_string())?;
        (body[..end].to_string(), &body[end + 1..])
    } else if let Some(body) = raw.strip_prefix('"') {
        unescape_double_quoted(body)?
    } else {
        let value = raw.split('#').next().unwrap_or_default().trim_end();
        return Ok(value.to_string());
    };

    let rest = rest.trim();
    if rest.is_empty() || rest.starts_with('#') {
        Ok(value)
    } else {
        Err("unexpected characters after closing quote".to_string())
    }
}

/// Returns the unescaped value and whatever follows the closing quote.
fn unescape_double_quoted(body: &str) -> Result<(String, &str), String> {
    let mut value = String::new();
    let mut chars = body.char_indices();
    while let Some((i, ch)) = chars.next() {
        match ch {
            '"' => return Ok((value, &body[i + 1..])),
            '\\' => {
                let (_, escaped) = chars.next().ok_or_else(|| "unterminated escape sequence".to_string())?;
                value.push(match escaped {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    other => other,
                });
            }
            other => value.push(other),
        }
    }
    Err("unterminated double-quoted value".to_string())
}
