//! Assembly language parser and word emitter.
//!
//! Every token becomes exactly one word in the instruction region, so a
//! program is just a flat stream of literals and mnemonics.
//!
//! # Syntax
//!
//! ```text
//! loop:  10 0 STOR        # comment
//!        'H' PRNCHAR
//!        @loop JMP
//! ```
//!
//! - Mnemonics are uppercase (e.g., `ADD`, `PRNCHAR`)
//! - Decimal integers are literals; a leading `-` selects the negative tag
//! - Character literals are single-quoted (e.g., `'H'`, `'\n'`)
//! - `0x` tokens are emitted verbatim as raw words
//! - `name:` defines a label at the next emitted word
//! - `@name` pushes the jump target that resumes execution at `name`
//! - Comments start with `#`
//! - Commas between tokens are optional

use crate::error;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Instruction;
use crate::virtual_machine::program::Program;
use crate::virtual_machine::word::{self, Tag, Word, encode};
use std::collections::HashMap;
use std::fmt::Write;
use std::fs;
use std::path::Path;

const COMMENT_CHAR: char = '#';
const LABEL_SUFFIX: char = ':';
const LABEL_REF_PREFIX: char = '@';
const CHAR_QUOTE: u8 = b'\'';

/// Return the line/column/message triple for assembly-related errors.
fn assembly_error_location(err: &VMError) -> Option<(usize, usize, String)> {
    match err {
        VMError::AssemblyError {
            line,
            offset,
            message,
        } => Some((*line, *offset, message.clone())),
        VMError::ParseError {
            line,
            offset,
            message,
        } => Some((*line, *offset, message.to_string())),
        _ => None,
    }
}

/// Formats a compiler-style diagnostic for assembly failures.
pub fn render_assembly_diagnostic(
    file: &str,
    source: &str,
    line: usize,
    offset: usize,
    message: &str,
) -> String {
    let mut diag = String::new();
    let _ = writeln!(diag, "error: {message}");
    let _ = writeln!(diag, " --> {file}:{line}:{offset}");

    if let Some(raw_line) = source.lines().nth(line.saturating_sub(1)) {
        let line_text = raw_line.trim_end_matches('\r');
        let underline = " ".repeat(offset.saturating_sub(1));
        let _ = writeln!(diag, "     |");
        let _ = writeln!(diag, "{:>4} | {}", line, line_text);
        let _ = writeln!(diag, "     | {}^", underline);
    }

    diag
}

/// Renders `err` as a diagnostic when it carries a source position, or as a
/// plain `error:` line otherwise.
pub fn diagnostic(file: &str, source: &str, err: &VMError) -> String {
    match assembly_error_location(err) {
        Some((line, offset, message)) => {
            render_assembly_diagnostic(file, source, line, offset, &message)
        }
        None => format!("error: {err}"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Token<'a> {
    text: &'a str,
    /// 1-based column offset in the line.
    offset: usize,
}

/// Tokenize a single line of assembly.
///
/// Rules:
/// - `#` starts a comment
/// - commas and whitespace separate tokens
/// - a single-quoted character literal is one token even if it holds a
///   separator, and `\` escapes the next character inside it
fn tokenize(line_no: usize, line: &str) -> Result<Vec<Token<'_>>, VMError> {
    let mut out = Vec::with_capacity(8);

    let mut start: Option<usize> = None;
    let mut in_char = false;

    let bytes = line.as_bytes();
    let mut i = 0;

    let mut flush = |start: &mut Option<usize>, end: usize| {
        if let Some(s) = start.take() {
            out.push(Token {
                text: &line[s..end],
                offset: s + 1,
            });
        }
    };

    while i < bytes.len() {
        let b = bytes[i];

        if in_char {
            match b {
                b'\\' => i += 2,
                CHAR_QUOTE => {
                    in_char = false;
                    i += 1;
                }
                _ => i += 1,
            }
            continue;
        }

        match b {
            b if b == COMMENT_CHAR as u8 => break,
            b',' | b' ' | b'\t' | b'\r' => {
                flush(&mut start, i);
                i += 1;
            }
            CHAR_QUOTE => {
                if start.is_none() {
                    start = Some(i);
                }
                in_char = true;
                i += 1;
            }
            _ => {
                if start.is_none() {
                    start = Some(i);
                }
                i += 1;
            }
        }
    }

    if in_char {
        return Err(VMError::ParseError {
            line: line_no,
            offset: start.map_or(1, |s| s + 1),
            message: "unterminated character literal (missing closing quote)",
        });
    }

    flush(&mut start, i);
    Ok(out)
}

/// Checks if a token is a label definition (ends with `:`).
fn is_label_def(tok: &str) -> bool {
    tok.len() > 1 && tok.ends_with(LABEL_SUFFIX) && !tok.starts_with(CHAR_QUOTE as char)
}

/// Extracts the label name from a label definition token.
fn label_name(tok: &str) -> &str {
    &tok[..tok.len() - 1]
}

/// Parse a signed decimal literal into a tagged word.
pub(crate) fn parse_int(tok: &str) -> Result<Word, VMError> {
    tok.parse::<i64>()
        .ok()
        .and_then(word::literal)
        .ok_or_else(|| VMError::InvalidLiteral {
            token: tok.to_string(),
        })
}

/// Parse a `0x` token into a raw word.
pub(crate) fn parse_raw(tok: &str) -> Result<Word, VMError> {
    tok.strip_prefix("0x")
        .or_else(|| tok.strip_prefix("0X"))
        .and_then(|hex| Word::from_str_radix(hex, 16).ok())
        .ok_or_else(|| VMError::InvalidLiteral {
            token: tok.to_string(),
        })
}

/// Parse a character literal like `'a'` or `'\n'` into a positive literal.
pub(crate) fn parse_char(tok: &str) -> Result<Word, VMError> {
    let invalid = || VMError::InvalidLiteral {
        token: tok.to_string(),
    };
    let inner = tok
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .ok_or_else(invalid)?;

    let mut chars = inner.chars();
    let ch = match (chars.next(), chars.next(), chars.next()) {
        (Some('\\'), Some(escaped), None) => match escaped {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            '\\' => '\\',
            '\'' => '\'',
            _ => return Err(invalid()),
        },
        (Some(ch), None, None) if ch != '\\' => ch,
        _ => return Err(invalid()),
    };
    Ok(encode(Tag::PositiveLiteral, ch as u32))
}

/// Label name to word index.
#[derive(Debug, Default)]
struct Labels {
    indices: HashMap<String, usize>,
}

impl Labels {
    fn define(&mut self, name: &str, index: usize) -> Result<(), VMError> {
        if self.indices.contains_key(name) {
            return Err(VMError::DuplicateLabel {
                label: name.to_string(),
            });
        }
        self.indices.insert(name.to_string(), index);
        Ok(())
    }

    /// Resolves `name` to the literal a jump needs to resume at it.
    ///
    /// Fetch pre-increments the instruction pointer, so the target is the
    /// label's index minus one. A label on word 0 has no such target.
    fn jump_target(&self, name: &str) -> Result<Word, VMError> {
        let index = self
            .indices
            .get(name)
            .copied()
            .ok_or_else(|| VMError::UndefinedLabel {
                label: name.to_string(),
            })?;
        let target = index.checked_sub(1).ok_or_else(|| VMError::InvalidJumpTarget {
            label: name.to_string(),
        })?;
        Ok(encode(Tag::PositiveLiteral, target as u32))
    }
}

/// Converts a single non-label token into its word.
fn parse_token(tok: &str, labels: &Labels) -> Result<Word, VMError> {
    if let Some(name) = tok.strip_prefix(LABEL_REF_PREFIX) {
        return labels.jump_target(name);
    }
    if tok.starts_with(CHAR_QUOTE as char) {
        return parse_char(tok);
    }
    if tok.starts_with("0x") || tok.starts_with("0X") {
        return parse_raw(tok);
    }
    if tok.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+') {
        return parse_int(tok);
    }
    Ok(Instruction::from_mnemonic(tok)?.word())
}

fn at(line: usize, token: &Token<'_>, err: VMError) -> VMError {
    VMError::AssemblyError {
        line,
        offset: token.offset,
        message: err.to_string(),
    }
}

/// Performs two-pass assembly.
///
/// Pass 1: tokenizes all lines and records label positions as word indices.
///
/// Pass 2: converts every remaining token into a word, resolving label references.
fn assemble_tokens(source: &str) -> Result<Program, VMError> {
    let mut labels = Labels::default();
    // (line_no, token) for every token that emits a word
    let mut pending: Vec<(usize, Token<'_>)> = Vec::new();

    for (line_no, line) in source.lines().enumerate() {
        for token in tokenize(line_no + 1, line)? {
            if is_label_def(token.text) {
                labels
                    .define(label_name(token.text), pending.len())
                    .map_err(|e| at(line_no + 1, &token, e))?;
            } else {
                pending.push((line_no + 1, token));
            }
        }
    }

    let words = pending
        .iter()
        .map(|(line_no, token)| {
            parse_token(token.text, &labels).map_err(|e| at(*line_no, token, e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Program::new(words))
}

/// Assemble a full source string into a program.
///
/// Labels may be referenced before they are defined. Errors carry the line
/// and column of the offending token.
pub fn assemble_source(source: impl AsRef<str>) -> Result<Program, VMError> {
    assemble_source_with_name(source.as_ref(), "<source>")
}

/// Assembles source with an associated filename for error diagnostics.
fn assemble_source_with_name(source: &str, source_name: &str) -> Result<Program, VMError> {
    let result = assemble_tokens(source);
    if let Err(err) = &result {
        error!("{}", diagnostic(source_name, source, err));
    }
    result
}

/// Convenience: assemble directly from file path
pub fn assemble_file<P: AsRef<Path>>(path: P) -> Result<Program, VMError> {
    let path_ref = path.as_ref();
    let source = fs::read_to_string(path_ref).map_err(|e| VMError::IoError {
        path: path_ref.display().to_string(),
        source: e,
    })?;
    assemble_source_with_name(&source, &path_ref.display().to_string())
}

/// Renders one line per word: index, raw hex and decoded form.
pub fn disassemble(words: &[Word]) -> String {
    let mut out = String::new();
    for (i, w) in words.iter().enumerate() {
        let _ = writeln!(out, "{:>3}  0x{:08X}  {}", i, w, word::decode(*w));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(line: &str) -> Vec<&str> {
        tokenize(1, line).unwrap().iter().map(|t| t.text).collect()
    }

    #[test]
    fn tokenize_splits_on_whitespace_and_commas() {
        assert_eq!(texts("10, 0 STOR\tPRN"), ["10", "0", "STOR", "PRN"]);
    }

    #[test]
    fn tokenize_strips_comments() {
        assert_eq!(texts("1 2 ADD # sum"), ["1", "2", "ADD"]);
        assert!(texts("# only a comment").is_empty());
        assert_eq!(texts("1 HALT# stop"), ["1", "HALT"]);
        assert_eq!(texts("'#'# hash"), ["'#'"]);
    }

    #[test]
    fn tokenize_keeps_quoted_separators() {
        assert_eq!(texts("' ' ',' '#' PRNCHAR"), ["' '", "','", "'#'", "PRNCHAR"]);
        assert_eq!(texts(r"'\'' 'a'"), [r"'\''", "'a'"]);
    }

    #[test]
    fn tokenize_records_columns() {
        let tokens = tokenize(1, "  HALT   DUP").unwrap();
        assert_eq!(tokens[0].offset, 3);
        assert_eq!(tokens[1].offset, 10);
    }

    #[test]
    fn tokenize_unterminated_char() {
        assert!(matches!(
            tokenize(4, "  'a PRNCHAR"),
            Err(VMError::ParseError {
                line: 4,
                offset: 3,
                ..
            })
        ));
    }

    #[test]
    fn parse_int_tags_sign() {
        assert_eq!(parse_int("0").unwrap(), 0);
        assert_eq!(parse_int("72").unwrap(), 72);
        assert_eq!(parse_int("-3").unwrap(), 0x8000_0003);
        assert!(matches!(
            parse_int("1073741824"),
            Err(VMError::InvalidLiteral { .. })
        ));
        assert!(parse_int("12abc").is_err());
    }

    #[test]
    fn parse_char_escapes() {
        assert_eq!(parse_char("'H'").unwrap(), 72);
        assert_eq!(parse_char(r"'\n'").unwrap(), 10);
        assert_eq!(parse_char(r"'\''").unwrap(), 39);
        assert_eq!(parse_char("'λ'").unwrap(), 0x3BB);
        assert!(parse_char("'ab'").is_err());
        assert!(parse_char(r"'\q'").is_err());
        assert!(parse_char("''").is_err());
    }

    #[test]
    fn parse_raw_words() {
        assert_eq!(parse_raw("0xC0000000").unwrap(), 0xC000_0000);
        assert_eq!(parse_raw("0x4000000c").unwrap(), 0x4000_000C);
        assert!(parse_raw("0x1_0000_0000").is_err());
        assert!(parse_raw("0xZZ").is_err());
    }

    #[test]
    fn comment_directly_after_token() {
        let program = assemble_source("1 PRN# print\nHALT#stop").unwrap();
        assert_eq!(
            program.words,
            vec![1, Instruction::Prn.word(), Instruction::Halt.word()]
        );
    }

    #[test]
    fn assemble_empty_source() {
        let program = assemble_source("").unwrap();
        assert!(program.is_empty());
    }

    #[test]
    fn assemble_hello_fragment() {
        let program = assemble_source("72 PRNCHAR 101 PRNCHAR HALT").unwrap();
        assert_eq!(
            program.words,
            vec![72, 0x4000_0009, 101, 0x4000_0009, 0x4000_0000]
        );
    }

    #[test]
    fn labels_resolve_to_resume_targets() {
        let program = assemble_source(
            r#"
                @end JMP
                'X' PRNCHAR
            end:
                HALT
            "#,
        )
        .unwrap();
        // `end` is word 4, so the jump target is 3.
        assert_eq!(program.words[0], 3);
        assert_eq!(program.words[4], Instruction::Halt.word());
    }

    #[test]
    fn label_on_same_line_as_code() {
        let program = assemble_source("1 top: DUP @top JZ HALT").unwrap();
        assert_eq!(program.words[2], 0);
    }

    #[test]
    fn label_on_first_word_is_not_a_target() {
        let err = assemble_source("start: HALT @start JMP").unwrap_err();
        assert!(matches!(err, VMError::AssemblyError { line: 1, offset: 13, .. }));
        assert!(err.to_string().contains("cannot be used as a jump target"));
    }

    #[test]
    fn undefined_label_reports_position() {
        let err = assemble_source("HALT\n  @nowhere JMP").unwrap_err();
        match err {
            VMError::AssemblyError {
                line,
                offset,
                message,
            } => {
                assert_eq!((line, offset), (2, 3));
                assert!(message.contains("undefined label: nowhere"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn duplicate_label() {
        let err = assemble_source("a: HALT\na: HALT").unwrap_err();
        assert!(matches!(err, VMError::AssemblyError { line: 2, .. }));
        assert!(err.to_string().contains("duplicate label"));
    }

    #[test]
    fn unknown_mnemonic() {
        let err = assemble_source("1 2 NOP").unwrap_err();
        assert!(matches!(
            err,
            VMError::AssemblyError {
                line: 1,
                offset: 5,
                ..
            }
        ));
        assert!(err.to_string().contains("invalid instruction name: NOP"));
    }

    #[test]
    fn diagnostic_points_at_token() {
        let source = "1 2 ADD\n  3 FOO";
        let err = assemble_source(source).unwrap_err();
        let diag = diagnostic("prog.asm", source, &err);
        assert!(diag.starts_with("error: invalid instruction name: FOO"));
        assert!(diag.contains(" --> prog.asm:2:5"));
        assert!(diag.contains("   2 |   3 FOO"));
        assert!(diag.contains("     |     ^"));
    }

    #[test]
    fn diagnostic_without_position() {
        let err = VMError::DivisionByZero;
        assert_eq!(diagnostic("x", "", &err), "error: division by zero");
    }

    #[test]
    fn disassemble_lists_words() {
        let listing = disassemble(&[10, 0x8000_0002, 0x4000_0008, 0x4000_0063]);
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines[0], "  0  0x0000000A  10");
        assert_eq!(lines[1], "  1  0x80000002  -2");
        assert_eq!(lines[2], "  2  0x40000008  PRN");
        assert_eq!(lines[3], "  3  0x40000063  ?99");
    }

    #[test]
    fn assemble_missing_file() {
        assert!(matches!(
            assemble_file("/nonexistent/prog.asm"),
            Err(VMError::IoError { .. })
        ));
    }
}
