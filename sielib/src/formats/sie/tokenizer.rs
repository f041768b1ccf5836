//! Разбиение строки SIE на поля.
//!
//! Поле — либо строка в кавычках (кавычки снимаются, пробелы внутри
//! сохраняются), либо список объектов в фигурных скобках (скобки остаются,
//! внутри могут быть и пробелы, и кавычки), либо просто непрерывный кусок
//! без пробелов.

use crate::model::ObjectRef;
use std::iter::Peekable;
use std::str::Chars;

pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '"' => {
                chars.next();
                tokens.push(read_quoted(&mut chars));
            }
            '{' => tokens.push(read_braced(&mut chars)),
            _ => {
                let mut s = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() {
                        break;
                    }
                    s.push(c);
                    chars.next();
                }
                tokens.push(s);
            }
        }
    }
    tokens
}

/// Открывающая кавычка уже съедена. `\"` и `\\` — экранированные кавычка
/// и обратная косая; прочие `\` остаются как есть (пути в старых файлах).
/// Незакрытая строка тянется до конца строки.
fn read_quoted(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut s = String::new();
    while let Some(c) = chars.next() {
        match c {
            '"' => break,
            '\\' if matches!(chars.peek(), Some('"' | '\\')) => {
                if let Some(escaped) = chars.next() {
                    s.push(escaped);
                }
            }
            _ => s.push(c),
        }
    }
    s
}

/// Читает `{...}` целиком, со скобками. `}` внутри кавычек скобку не закрывает.
/// Экранирование не снимается: список ещё раз пройдёт через `tokenize`.
fn read_braced(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut s = String::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escaped = false;

    for c in chars.by_ref() {
        s.push(c);
        if in_quotes {
            match c {
                '\\' if !escaped => {
                    escaped = true;
                    continue;
                }
                '"' if !escaped => in_quotes = false,
                _ => {}
            }
            escaped = false;
            continue;
        }
        match c {
            '"' => in_quotes = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
    }
    s
}

/// `{1 "100" 2 "200"}` -> [(1, 100), (2, 200)]. Непарный хвост отбрасывается.
pub fn decode_objects(token: &str) -> Vec<ObjectRef> {
    let inner = token.trim();
    let inner = inner.strip_prefix('{').unwrap_or(inner);
    let inner = inner.strip_suffix('}').unwrap_or(inner);
    if inner.trim().is_empty() {
        return Vec::new();
    }

    let parts = tokenize(inner);
    parts
        .chunks_exact(2)
        .map(|pair| ObjectRef::new(pair[0].as_str(), pair[1].as_str()))
        .collect()
}

/// Починка строки, у которой после разбиения не хватает полей.
///
/// `rest` — сырой текст после тега. Первая `{` и последняя `}` заново
/// выделяют список объектов, остальное режется по пробелам. Без закрывающей
/// скобки весь остаток режется по пробелам как есть. Никогда не падает.
pub fn repair_fields(rest: &str) -> Vec<String> {
    let open = rest.find('{');
    let close = rest.rfind('}');

    match (open, close) {
        (Some(open), Some(close)) if open < close => {
            let mut fields = split_plain(&rest[..open]);
            fields.push(rest[open..=close].to_string());
            fields.extend(split_plain(&rest[close + 1..]));
            fields
        }
        _ => rest.split_whitespace().map(str::to_string).collect(),
    }
}

fn split_plain(s: &str) -> Vec<String> {
    s.split_whitespace()
        .map(|f| {
            f.strip_prefix('"')
                .and_then(|f| f.strip_suffix('"'))
                .unwrap_or(f)
                .to_string()
        })
        .collect()
}
