//! Best-effort repair of malformed JSON
//!
//! Only used after strict parsing has failed. The parser is a small
//! recursive-descent reader that accepts what generators commonly emit:
//!
//! - prose before or after the first JSON container
//! - trailing or doubled commas
//! - unescaped double quotes inside strings
//! - single-quoted strings and unquoted object keys
//! - `True` / `False` / `None` literals
//! - `//` and `/* */` comments
//! - containers cut off at end of input (closed implicitly)

use crate::error::GatekeeperError;
use serde_json::{Map, Number, Value};

/// Nesting limit; deeper input is rejected instead of risking the stack
const MAX_DEPTH: usize = 256;

/// Parse `text` leniently into a JSON value
///
/// Fails when the text contains no object or array at all, or when the
/// content is too broken to recover.
///
/// # Examples
///
/// ```
/// use reframe_gatekeeper::repair_json;
/// use serde_json::json;
///
/// let value = repair_json("{'name': 'FlexFit', tags: ['gym',],}").unwrap();
/// assert_eq!(value, json!({"name": "FlexFit", "tags": ["gym"]}));
/// ```
pub fn repair_json(text: &str) -> Result<Value, GatekeeperError> {
    let chars: Vec<char> = text.chars().collect();
    let start = chars
        .iter()
        .position(|c| *c == '{' || *c == '[')
        .ok_or_else(|| GatekeeperError::Parse("no JSON object or array found".to_string()))?;

    let mut reader = Reader {
        chars,
        pos: start,
        depth: 0,
    };
    reader.parse_value()
}

struct Reader {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Reader {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn error(&self, message: &str) -> GatekeeperError {
        GatekeeperError::Parse(format!("{} at character {}", message, self.pos))
    }

    /// Skip whitespace and comments
    fn skip_trivia(&mut self) {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    self.pos += 1;
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                (Some('/'), Some('*')) => {
                    self.pos += 2;
                    while self.peek().is_some() {
                        if self.peek() == Some('*') && self.peek_at(1) == Some('/') {
                            self.pos += 2;
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => return,
            }
        }
    }

    fn parse_value(&mut self) -> Result<Value, GatekeeperError> {
        self.skip_trivia();
        match self.peek() {
            Some('{') => self.nested(Self::parse_object),
            Some('[') => self.nested(Self::parse_array),
            Some(q @ ('"' | '\'')) => self.parse_string(q).map(Value::String),
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number(),
            Some(c) if c.is_alphabetic() || c == '_' => Ok(self.parse_bareword()),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Value, GatekeeperError>,
    ) -> Result<Value, GatekeeperError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn parse_object(&mut self) -> Result<Value, GatekeeperError> {
        self.bump(); // '{'
        let mut map = Map::new();

        loop {
            self.skip_trivia();
            match self.peek() {
                None => return Ok(Value::Object(map)),
                Some('}') => {
                    self.bump();
                    return Ok(Value::Object(map));
                }
                Some(',') => {
                    self.bump();
                    continue;
                }
                Some(']') => {
                    // Mismatched closer: treat as the end of this object
                    self.bump();
                    return Ok(Value::Object(map));
                }
                _ => {}
            }

            let key = self.parse_key()?;
            self.skip_trivia();

            match self.peek() {
                Some(':') => {
                    self.bump();
                }
                None | Some(',') | Some('}') => {
                    map.insert(key, Value::Null);
                    continue;
                }
                Some(_) => return Err(self.error("expected ':' after object key")),
            }

            self.skip_trivia();
            let value = match self.peek() {
                None | Some(',') | Some('}') => Value::Null,
                _ => self.parse_value()?,
            };
            map.insert(key, value);
        }
    }

    fn parse_key(&mut self) -> Result<String, GatekeeperError> {
        match self.peek() {
            Some(q @ ('"' | '\'')) => self.parse_string(q),
            _ => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c == ':' || c == ',' || c == '}' || c.is_whitespace() {
                        break;
                    }
                    self.pos += 1;
                }
                if self.pos == start {
                    return Err(self.error("expected object key"));
                }
                Ok(self.chars[start..self.pos].iter().collect())
            }
        }
    }

    fn parse_array(&mut self) -> Result<Value, GatekeeperError> {
        self.bump(); // '['
        let mut items = Vec::new();

        loop {
            self.skip_trivia();
            match self.peek() {
                None => return Ok(Value::Array(items)),
                Some(']') => {
                    self.bump();
                    return Ok(Value::Array(items));
                }
                Some(',') => {
                    self.bump();
                }
                Some('}') => {
                    self.bump();
                    return Ok(Value::Array(items));
                }
                _ => items.push(self.parse_value()?),
            }
        }
    }

    /// Whether the quote at the current position closes the string
    ///
    /// A quote is a terminator when the next meaningful character is a
    /// structural one (or the input ends); otherwise it is taken to be an
    /// unescaped quote inside the text.
    fn quote_closes(&self) -> bool {
        let mut i = self.pos + 1;
        while let Some(c) = self.chars.get(i) {
            if c.is_whitespace() {
                i += 1;
                continue;
            }
            return matches!(c, ',' | '}' | ']' | ':');
        }
        true
    }

    fn parse_string(&mut self, quote: char) -> Result<String, GatekeeperError> {
        self.bump(); // opening quote
        let mut out = String::new();

        while let Some(c) = self.peek() {
            if c == quote {
                if self.quote_closes() {
                    self.bump();
                    return Ok(out);
                }
                out.push(c);
                self.bump();
                continue;
            }

            self.bump();
            if c != '\\' {
                out.push(c);
                continue;
            }

            match self.bump() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('b') => out.push('\u{0008}'),
                Some('f') => out.push('\u{000C}'),
                Some('u') => out.push(self.parse_unicode_escape()),
                Some(other) => out.push(other),
                None => break,
            }
        }

        // Unterminated string: keep what was read
        Ok(out)
    }

    fn read_hex4(&mut self) -> Option<u32> {
        let digits: String = self.chars.get(self.pos..self.pos + 4)?.iter().collect();
        let code = u32::from_str_radix(&digits, 16).ok()?;
        self.pos += 4;
        Some(code)
    }

    fn parse_unicode_escape(&mut self) -> char {
        let Some(high) = self.read_hex4() else {
            return 'u';
        };

        if (0xD800..0xDC00).contains(&high)
            && self.peek() == Some('\\')
            && self.peek_at(1) == Some('u')
        {
            let save = self.pos;
            self.pos += 2;
            if let Some(low) = self.read_hex4() {
                if (0xDC00..0xE000).contains(&low) {
                    let combined = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                    return char::from_u32(combined).unwrap_or(char::REPLACEMENT_CHARACTER);
                }
            }
            self.pos = save;
        }

        char::from_u32(high).unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    fn parse_number(&mut self) -> Result<Value, GatekeeperError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        let raw = raw.trim_end_matches('.');

        if let Ok(n) = raw.parse::<i64>() {
            return Ok(Value::Number(n.into()));
        }
        if let Ok(n) = raw.parse::<u64>() {
            return Ok(Value::Number(n.into()));
        }
        raw.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| self.error("invalid number"))
    }

    /// Literals, plus bare text treated as a string
    fn parse_bareword(&mut self) -> Value {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, ',' | '}' | ']' | '\n') {
                break;
            }
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        let word = word.trim();

        match word {
            "true" | "True" => Value::Bool(true),
            "false" | "False" => Value::Bool(false),
            "null" | "None" | "undefined" => Value::Null,
            other => Value::String(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trailing_commas() {
        let value = repair_json(r#"{"a": [1, 2, 3,], "b": {"c": true,},}"#).unwrap();
        assert_eq!(value, json!({"a": [1, 2, 3], "b": {"c": true}}));
    }

    #[test]
    fn test_unescaped_inner_quotes() {
        let value = repair_json(r#"{"quote": "She said "go big" today"}"#).unwrap();
        assert_eq!(value, json!({"quote": "She said \"go big\" today"}));
    }

    #[test]
    fn test_single_quotes_and_bare_keys() {
        let value = repair_json("{name: 'FlexFit', 'members': 120}").unwrap();
        assert_eq!(value, json!({"name": "FlexFit", "members": 120}));
    }

    #[test]
    fn test_python_literals() {
        let value = repair_json("[True, False, None]").unwrap();
        assert_eq!(value, json!([true, false, null]));
    }

    #[test]
    fn test_surrounding_prose() {
        let value = repair_json("Sure! Here is the JSON:\n{\"ok\": 1}\nLet me know.").unwrap();
        assert_eq!(value, json!({"ok": 1}));
    }

    #[test]
    fn test_comments_are_skipped() {
        let value = repair_json("{\n// note\n\"a\": 1, /* gone */ \"b\": 2}").unwrap();
        assert_eq!(value, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_truncated_input_is_closed() {
        let value = repair_json(r#"{"flow": [{"step": "intro"}, {"step": "analy"#).unwrap();
        assert_eq!(value, json!({"flow": [{"step": "intro"}, {"step": "analy"}]}));
    }

    #[test]
    fn test_missing_value_becomes_null() {
        let value = repair_json(r#"{"a": , "b": 1}"#).unwrap();
        assert_eq!(value, json!({"a": null, "b": 1}));
    }

    #[test]
    fn test_escapes_are_decoded() {
        let value = repair_json(r#"{"s": "line\nnext é 😀",}"#).unwrap();
        assert_eq!(value, json!({"s": "line\nnext é 😀"}));
    }

    #[test]
    fn test_floats_and_negatives() {
        let value = repair_json("[-3, 2.5, 1e3, 7.,]").unwrap();
        assert_eq!(value, json!([-3, 2.5, 1000.0, 7]));
    }

    #[test]
    fn test_no_container_is_an_error() {
        let err = repair_json("I'm sorry, I can't help with that.").unwrap_err();
        assert!(matches!(err, GatekeeperError::Parse(_)));
    }

    #[test]
    fn test_key_order_is_preserved() {
        let value = repair_json("{'z': 1, 'a': 2,}").unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn test_excessive_nesting_is_rejected() {
        let text = "[".repeat(MAX_DEPTH + 10);
        assert!(repair_json(&text).is_err());
    }
}
