//! Line-oriented tokenizer. Comments run from `#` or `;` to end of line;
//! string and character literals take C-style escapes.

use crate::utils::escape_char;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifier, mnemonic, label or directive (leading `.` kept).
    Ident(String),
    Int(i64),
    Float(f32),
    Str(String),
    Char(u8),
    /// `%hi`, `%lo`, `%pcrel_hi`, `%pcrel_lo`
    Percent(String),
    LParen,
    RParen,
    Comma,
    Colon,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '.' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '$'
}

/// Tokenizes one source line. Errors carry a short message for the
/// diagnostic collector.
pub fn tokenize(line: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            '#' | ';' => break,
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            ':' => {
                chars.next();
                tokens.push(Token::Colon);
            }
            '%' => {
                chars.next();
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.is_empty() {
                    return Err("expected operator name after '%'".into());
                }
                tokens.push(Token::Percent(name));
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        None => return Err("unterminated string literal".into()),
                        Some('"') => break,
                        Some('\\') => {
                            let esc = chars.next().ok_or("unterminated string literal")?;
                            let b = escape_char(esc)
                                .ok_or_else(|| format!("unknown escape: \\{esc}"))?;
                            value.push(b as char);
                        }
                        Some(c) => value.push(c),
                    }
                }
                tokens.push(Token::Str(value));
            }
            '\'' => {
                chars.next();
                let b = match chars.next() {
                    None => return Err("unterminated character literal".into()),
                    Some('\\') => {
                        let esc = chars.next().ok_or("unterminated character literal")?;
                        escape_char(esc).ok_or_else(|| format!("unknown escape: \\{esc}"))?
                    }
                    Some(c) if c.is_ascii() => c as u8,
                    Some(c) => return Err(format!("non-ascii character literal: {c}")),
                };
                match chars.next() {
                    Some('\'') => tokens.push(Token::Char(b)),
                    _ => return Err("unterminated character literal".into()),
                }
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' => {
                chars.next();
                let mut body = String::new();
                body.push(c);
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '.' {
                        body.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(number(&body)?);
            }
            c if is_ident_start(c) => {
                chars.next();
                let mut name = String::new();
                name.push(c);
                while let Some(&c) = chars.peek() {
                    if is_ident_continue(c) {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(name));
            }
            c => return Err(format!("illegal character: {c:?}")),
        }
    }
    Ok(tokens)
}

fn number(body: &str) -> Result<Token, String> {
    let body = body.strip_prefix('+').unwrap_or(body);
    if let Some(v) = crate::utils::parse_int(body) {
        return Ok(Token::Int(v));
    }
    if let Some(f) = crate::utils::parse_float(body) {
        return Ok(Token::Float(f));
    }
    Err(format!("invalid numeric literal: {body}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_instruction() {
        let tokens = tokenize("addi x1, x0, 7").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("addi".into()),
                Token::Ident("x1".into()),
                Token::Comma,
                Token::Ident("x0".into()),
                Token::Comma,
                Token::Int(7),
            ]
        );
    }

    #[test]
    fn label_and_comment() {
        let tokens = tokenize("loop: beq x1, x2, done # back edge").unwrap();
        assert_eq!(tokens[0], Token::Ident("loop".into()));
        assert_eq!(tokens[1], Token::Colon);
        assert!(!tokens.iter().any(|t| matches!(t, Token::Ident(s) if s == "back")));
    }

    #[test]
    fn memory_operand() {
        let tokens = tokenize("lw x5, -4(sp)").unwrap();
        assert!(tokens.contains(&Token::Int(-4)));
        assert!(tokens.contains(&Token::LParen));
        assert!(tokens.contains(&Token::RParen));
    }

    #[test]
    fn bases_and_floats() {
        assert_eq!(tokenize("0x10").unwrap(), vec![Token::Int(16)]);
        assert_eq!(tokenize("0b1010").unwrap(), vec![Token::Int(10)]);
        assert_eq!(tokenize("0o17").unwrap(), vec![Token::Int(15)]);
        assert_eq!(tokenize("3.25").unwrap(), vec![Token::Float(3.25)]);
    }

    #[test]
    fn string_escapes() {
        let tokens = tokenize(".asciz \"hi\\n\"").unwrap();
        assert_eq!(tokens[1], Token::Str("hi\n".into()));
    }

    #[test]
    fn char_literal() {
        assert_eq!(tokenize("'A'").unwrap(), vec![Token::Char(b'A')]);
        assert_eq!(tokenize("'\\n'").unwrap(), vec![Token::Char(b'\n')]);
    }

    #[test]
    fn percent_operator() {
        let tokens = tokenize("lui x1, %hi(msg)").unwrap();
        assert!(tokens.contains(&Token::Percent("hi".into())));
    }

    #[test]
    fn lex_errors() {
        assert!(tokenize("\"unterminated").is_err());
        assert!(tokenize("addi x1, x0, @").is_err());
        assert!(tokenize("'ab'").is_err());
    }

    #[test]
    fn semicolon_comment() {
        let tokens = tokenize("nop ; trailing").unwrap();
        assert_eq!(tokens, vec![Token::Ident("nop".into())]);
    }
}
