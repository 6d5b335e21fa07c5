//! Escape classification for runs of braces
//!
//! A run is a maximal sequence of one brace character, possibly broken by
//! whitespace: `{{`, `{ {{`, `}} }`. Doubled braces are escapes for a literal
//! brace; braces adjacent to a placeholder may instead be *reserved* as its
//! delimiters.

use crate::error::{Error, Span};

/// Which side of a placeholder a run sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn brace(self) -> char {
        match self {
            Side::Left => '{',
            Side::Right => '}',
        }
    }
}

/// A run of braces and the byte offset where it starts in the template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BraceRun<'t> {
    pub text: &'t str,
    pub offset: usize,
}

impl<'t> BraceRun<'t> {
    pub fn new(text: &'t str, offset: usize) -> Self {
        Self { text, offset }
    }

    /// Number of brace characters in the run
    pub fn braces(&self) -> usize {
        self.text.chars().filter(|c| matches!(c, '{' | '}')).count()
    }
}

#[derive(Debug, Clone, Copy)]
enum Piece<'t> {
    Braces { count: usize, offset: usize },
    Space(&'t str),
}

fn pieces(run: BraceRun<'_>) -> Vec<Piece<'_>> {
    let mut out = Vec::new();
    let mut chars = run.text.char_indices().peekable();
    while let Some((start, ch)) = chars.next() {
        let brace = matches!(ch, '{' | '}');
        let mut end = start + ch.len_utf8();
        while let Some(&(i, next)) = chars.peek() {
            if matches!(next, '{' | '}') != brace {
                break;
            }
            end = i + next.len_utf8();
            chars.next();
        }
        out.push(if brace {
            Piece::Braces {
                count: end - start,
                offset: run.offset + start,
            }
        } else {
            Piece::Space(&run.text[start..end])
        });
    }
    out
}

fn single_brace(side: Side, span: Span) -> Error {
    Error::malformed(format!("single '{}' encountered", side.brace()), span)
}

/// Collapse a run into the literal text it stands for
///
/// `reserved` braces nearest the placeholder are consumed as delimiters and
/// whitespace lying among them is dropped. Every remaining group of braces
/// must be doubled and contributes half its braces to the output.
pub fn collapse(run: BraceRun<'_>, side: Side, reserved: usize) -> Result<String, Error> {
    let mut ordered = pieces(run);
    // the end adjacent to the placeholder comes first
    if side == Side::Left {
        ordered.reverse();
    }

    let mut pending = reserved;
    let mut kept = Vec::with_capacity(ordered.len());
    for piece in ordered {
        match piece {
            Piece::Space(_) if pending > 0 => {}
            Piece::Braces { count, offset } if pending > 0 => {
                let taken = count.min(pending);
                pending -= taken;
                if count > taken {
                    let offset = match side {
                        Side::Left => offset,
                        Side::Right => offset + taken,
                    };
                    kept.push(Piece::Braces {
                        count: count - taken,
                        offset,
                    });
                }
            }
            other => kept.push(other),
        }
    }
    if pending > 0 {
        let end = run.offset + run.text.len();
        return Err(single_brace(side, run.offset..end));
    }

    if side == Side::Left {
        kept.reverse();
    }
    let mut literal = String::with_capacity(run.text.len());
    for piece in kept {
        match piece {
            Piece::Braces { count, offset } if count % 2 == 1 => {
                let last = offset + count - 1;
                return Err(single_brace(side, last..last + 1));
            }
            Piece::Braces { count, .. } => {
                literal.extend(std::iter::repeat(side.brace()).take(count / 2));
            }
            Piece::Space(space) => literal.push_str(space),
        }
    }
    Ok(literal)
}
