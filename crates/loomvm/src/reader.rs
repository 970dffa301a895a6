//! A minimal scanner.
//!
//! The lexical dialect scanner is an external collaborator out of scope for
//! this crate: its full grammar (radix literals, tuples, email/url/tag
//! forms, line/column tracking for error reporting, `#[...]` construction
//! syntax, and so on) lives elsewhere. What's here is just enough to turn
//! source text into cells for tests, the CLI, and variadic-feed fragment
//! splicing: integers, logic, blank, words and their set/get variants,
//! strings, and nested blocks/groups.

use crate::arena::Arena;
use crate::cell::Cell;
use crate::error::EvalError;
use crate::series::Series;
use crate::symbol::Interns;

/// Scans `text` into a flat sequence of cells (no implicit outer block).
/// Used both by [`scan`] (which wraps the result in a block) and by a
/// feed's variadic splicing of a raw source fragment.
#[must_use]
pub fn scan_fragment(text: &str, arena: &mut Arena, interns: &mut Interns) -> Vec<Cell> {
    let mut chars = text.chars().peekable();
    scan_sequence(&mut chars, arena, interns, None)
}

/// Scans `source` into a new managed block array, the top-level entry point
/// a caller hands a whole program to.
///
/// # Errors
/// Returns a syntax error on an unmatched closing bracket or unterminated
/// string literal.
pub fn scan(source: &str, arena: &mut Arena, interns: &mut Interns) -> Result<crate::arena::NodeId, EvalError> {
    let mut chars = source.chars().peekable();
    let cells = scan_sequence(&mut chars, arena, interns, None);
    if let Some(c) = chars.peek() {
        return Err(EvalError::syntax(format!("unexpected '{c}' while scanning")));
    }
    let node = arena.alloc_series(Series::from_cells(cells));
    arena.manage(node);
    Ok(node)
}

type Chars<'a> = std::iter::Peekable<std::str::Chars<'a>>;

fn skip_ws(chars: &mut Chars<'_>) {
    while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
        chars.next();
    }
}

fn scan_sequence(chars: &mut Chars<'_>, arena: &mut Arena, interns: &mut Interns, closing: Option<char>) -> Vec<Cell> {
    let mut out = Vec::new();
    loop {
        skip_ws(chars);
        match chars.peek().copied() {
            None => break,
            Some(c) if Some(c) == closing => {
                chars.next();
                break;
            }
            Some('[') => {
                chars.next();
                let inner = scan_sequence(chars, arena, interns, Some(']'));
                let node = arena.alloc_series(Series::from_cells(inner));
                arena.manage(node);
                out.push(Cell::block(node));
            }
            Some('(') => {
                chars.next();
                let inner = scan_sequence(chars, arena, interns, Some(')'));
                let node = arena.alloc_series(Series::from_cells(inner));
                arena.manage(node);
                out.push(Cell::group(node));
            }
            Some('"') => {
                chars.next();
                out.push(scan_string(chars, arena));
            }
            _ => out.push(scan_token(chars, interns)),
        }
    }
    out
}

fn scan_string(chars: &mut Chars<'_>, arena: &mut Arena) -> Cell {
    let mut text = String::new();
    for c in chars.by_ref() {
        if c == '"' {
            break;
        }
        text.push(c);
    }
    let node = arena.alloc_series(Series::from_text(&text));
    arena.manage(node);
    Cell::new(crate::cell::CellData::Text(node))
}

fn is_token_boundary(c: char) -> bool {
    c.is_whitespace() || matches!(c, '[' | ']' | '(' | ')' | '"')
}

fn scan_token(chars: &mut Chars<'_>, interns: &mut Interns) -> Cell {
    let mut token = String::new();
    while let Some(&c) = chars.peek() {
        if is_token_boundary(c) {
            break;
        }
        token.push(c);
        chars.next();
    }
    classify_token(&token, interns)
}

fn classify_token(token: &str, interns: &mut Interns) -> Cell {
    if token == "_" {
        return Cell::blank();
    }
    if token == "true" {
        return Cell::logic(true);
    }
    if token == "false" {
        return Cell::logic(false);
    }
    if let Ok(n) = token.parse::<i64>() {
        return Cell::integer(n);
    }
    if let Some(name) = token.strip_suffix(':') {
        if !name.is_empty() {
            return Cell::set_word(interns.intern(name));
        }
    }
    if let Some(name) = token.strip_prefix(':') {
        if !name.is_empty() {
            return Cell::get_word(interns.intern(name));
        }
    }
    Cell::word(interns.intern(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{CellData, Kind};

    #[test]
    fn scans_flat_arithmetic_expression() {
        let mut arena = Arena::new();
        let mut interns = Interns::new();
        let node = scan("1 + 2 * 3", &mut arena, &mut interns).unwrap();
        let cells = arena.series(node).as_cells().unwrap().to_vec();
        assert_eq!(cells.len(), 5);
        assert_eq!(cells[0].kind(), Kind::Integer);
        assert_eq!(cells[1].kind(), Kind::Word);
    }

    #[test]
    fn scans_nested_block() {
        let mut arena = Arena::new();
        let mut interns = Interns::new();
        let node = scan("[a b [c]]", &mut arena, &mut interns).unwrap();
        let cells = arena.series(node).as_cells().unwrap().to_vec();
        assert_eq!(cells.len(), 1);
        let CellData::Block(inner) = cells[0].data else {
            panic!("expected a block");
        };
        assert_eq!(arena.series(inner).len(), 3);
    }

    #[test]
    fn scans_set_word_and_string() {
        let mut arena = Arena::new();
        let mut interns = Interns::new();
        let node = scan(r#"x: "hi""#, &mut arena, &mut interns).unwrap();
        let cells = arena.series(node).as_cells().unwrap().to_vec();
        assert_eq!(cells[0].kind(), Kind::SetWord);
        assert_eq!(cells[1].kind(), Kind::Text);
    }
}
