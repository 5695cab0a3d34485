//! Tokenizer — splits a rule sentence into words, operators and punctuation.

use std::fmt;
use std::ops::Range;

use crate::value::CompareOp;

use super::ParseError;

/// A single lexical unit of a rule sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Anything that is not an operator or punctuation, casing preserved.
    Word(String),
    Operator(CompareOp),
    Punct(char),
}

impl Token {
    /// Case-insensitive keyword check; only words can be keywords.
    #[must_use]
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Self::Word(w) if w.eq_ignore_ascii_case(keyword))
    }

    #[must_use]
    pub fn as_word(&self) -> Option<&str> {
        match self {
            Self::Word(w) => Some(w),
            Self::Operator(_) | Self::Punct(_) => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Word(w) => f.write_str(w),
            Self::Operator(op) => op.fmt(f),
            Self::Punct(c) => write!(f, "{c}"),
        }
    }
}

const PUNCTUATION: [char; 4] = [',', ';', '(', ')'];

fn is_operator_char(c: char) -> bool {
    matches!(c, '>' | '<' | '=' | '!')
}

/// Split `text` into tokens.
///
/// A `.` is punctuation only when it ends a word (followed by whitespace or
/// the end of input), so `21.5` and `a@b.com` stay single words.
///
/// # Errors
///
/// Returns [`ParseError::UnexpectedCharacter`] for a `!` that is not part
/// of `!=`.
pub fn tokenize(text: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(position, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if is_operator_char(c) {
            chars.next();
            let followed_by_eq = chars.next_if(|&(_, n)| n == '=').is_some();
            let op = match (c, followed_by_eq) {
                ('>', false) => CompareOp::Gt,
                ('>', true) => CompareOp::Ge,
                ('<', false) => CompareOp::Lt,
                ('<', true) => CompareOp::Le,
                ('=', _) => CompareOp::Eq,
                ('!', true) => CompareOp::Ne,
                _ => {
                    return Err(ParseError::UnexpectedCharacter {
                        character: c,
                        position,
                    });
                }
            };
            tokens.push(Token::Operator(op));
            continue;
        }

        if PUNCTUATION.contains(&c) {
            chars.next();
            tokens.push(Token::Punct(c));
            continue;
        }

        let mut word = String::new();
        while let Some(&(_, c)) = chars.peek() {
            if c.is_whitespace() || is_operator_char(c) || PUNCTUATION.contains(&c) {
                break;
            }
            chars.next();
            if c == '.' && chars.peek().is_none_or(|&(_, n)| n.is_whitespace()) {
                if !word.is_empty() {
                    tokens.push(Token::Word(std::mem::take(&mut word)));
                }
                tokens.push(Token::Punct('.'));
                break;
            }
            word.push(c);
        }
        if !word.is_empty() {
            tokens.push(Token::Word(word));
        }
    }

    Ok(tokens)
}

fn is_boundary(c: char) -> bool {
    c.is_whitespace() || is_operator_char(c) || PUNCTUATION.contains(&c)
}

/// Byte range of the first whole-word, case-insensitive occurrence of
/// `keyword` in `text`.
#[must_use]
pub fn find_keyword(text: &str, keyword: &str) -> Option<Range<usize>> {
    let mut previous = None;
    for (start, c) in text.char_indices() {
        let at_word_start = previous.is_none_or(is_boundary);
        previous = Some(c);
        if !at_word_start {
            continue;
        }
        let end = start + keyword.len();
        let Some(candidate) = text.get(start..end) else {
            continue;
        };
        let ends_word = text[end..].chars().next().is_none_or(is_boundary);
        if ends_word && candidate.eq_ignore_ascii_case(keyword) {
            return Some(start..end);
        }
    }
    None
}

/// Render tokens back to text: single spaces between words and operators,
/// closing punctuation attached to the preceding token.
#[must_use]
pub fn render(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        let attach = matches!(token, Token::Punct(',' | ';' | '.' | ')'));
        if !out.is_empty() && !attach && !out.ends_with('(') {
            out.push(' ');
        }
        out.push_str(&token.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(w: &str) -> Token {
        Token::Word(w.to_string())
    }

    #[test]
    fn should_split_words_and_operators() {
        let tokens = tokenize("if kitchen temperature >= 21.5 then").unwrap();
        assert_eq!(
            tokens,
            vec![
                word("if"),
                word("kitchen"),
                word("temperature"),
                Token::Operator(CompareOp::Ge),
                word("21.5"),
                word("then"),
            ]
        );
    }

    #[test]
    fn should_split_operators_without_surrounding_spaces() {
        let tokens = tokenize("a>25").unwrap();
        assert_eq!(
            tokens,
            vec![word("a"), Token::Operator(CompareOp::Gt), word("25")]
        );
    }

    #[test]
    fn should_accept_single_equals_as_equality() {
        let tokens = tokenize("motion = true").unwrap();
        assert_eq!(tokens[1], Token::Operator(CompareOp::Eq));
        let tokens = tokenize("motion == true").unwrap();
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn should_reject_lone_exclamation_mark() {
        let err = tokenize("a ! b").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnexpectedCharacter {
                character: '!',
                position: 2
            }
        );
    }

    #[test]
    fn should_treat_trailing_dot_as_punctuation() {
        let tokens = tokenize("then hall light on.").unwrap();
        assert_eq!(tokens.last(), Some(&Token::Punct('.')));
        assert_eq!(tokens[tokens.len() - 2], word("on"));
    }

    #[test]
    fn should_keep_dots_inside_words() {
        let tokens = tokenize("sms ops@example.com").unwrap();
        assert_eq!(tokens, vec![word("sms"), word("ops@example.com")]);
    }

    #[test]
    fn should_match_keywords_case_insensitively() {
        assert!(word("IF").is_keyword("if"));
        assert!(!Token::Punct(',').is_keyword(","));
    }

    #[test]
    fn should_find_keyword_as_whole_word_only() {
        let text = "if authentic > 1, THEN hall light on";
        assert_eq!(find_keyword(text, "then"), Some(18..22));
        assert_eq!(find_keyword("if a>1,then b", "then"), Some(7..11));
        assert_eq!(find_keyword("if athen > 1", "then"), None);
        assert_eq!(find_keyword("if thenceforth > 1", "then"), None);
        assert_eq!(find_keyword("if é > 1 then x", "then"), Some(10..14));
    }

    #[test]
    fn should_render_tokens_with_attached_punctuation() {
        let tokens = tokenize("hall light on , now").unwrap();
        assert_eq!(render(&tokens), "hall light on, now");
    }
}
