//! Statement grammar over the token stream.
//!
//! A keymap file is a sequence of top-level directives and bindings:
//!
//! ```text
//! other keys fall through
//! R0,K1: click A
//! R2,K3: on click: click B
//!        on hold: switch to Nav until released
//! ```
//!
//! A binding is `R<row>,K<key>:` followed by either operation blocks
//! (`on <op>: <actions>`) or one inline action run, which binds to PRESS.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::vec;
use alloc::vec::Vec;

use crate::build::build_action;
use crate::layer::{key_index, KeyIndex, Layer, Operation};
use crate::log::*;
use crate::token::{tokenize, CompileError, Token, TokenKind};

/// One `R,K:` statement: a key plus its operation-tagged action runs.
///
/// Repeating an operation block within one statement overwrites the earlier
/// run; the map mirrors that.
#[derive(Debug)]
pub struct Binding {
    pub key: KeyIndex,
    pub runs: BTreeMap<Operation, Vec<Token>>,
}

/// A parsed file: directive tokens and bindings in source order.
#[derive(Debug, Default)]
pub struct ParsedFile {
    pub directives: Vec<Token>,
    pub bindings: Vec<Binding>,
}

fn operation_from_token(kind: TokenKind) -> Operation {
    match kind {
        TokenKind::OpPress => Operation::Press,
        TokenKind::OpClick => Operation::Click,
        TokenKind::OpHold => Operation::Hold,
        TokenKind::OpDoubleClick => Operation::DoubleClick,
        _ => Operation::Release,
    }
}

fn coordinate(source: &str, token: &Token) -> Result<u16, CompileError> {
    token.lexeme(source)[1..].parse().map_err(|_| {
        CompileError::at(
            token.line,
            format!("Coordinate out of range: {}", token.lexeme(source)),
        )
    })
}

/// Groups tokens into directives and bindings.
pub fn parse(source: &str, tokens: &[Token]) -> Result<ParsedFile, CompileError> {
    let mut file = ParsedFile::default();
    let mut index = 0;

    while index < tokens.len() {
        let row = tokens[index];

        if matches!(
            row.kind,
            TokenKind::OtherKeysFallThrough | TokenKind::BlockOtherKeys
        ) {
            file.directives.push(row);
            index += 1;
            continue;
        }

        if row.kind != TokenKind::RowLit {
            return Err(CompileError::at(
                row.line,
                format!("Expected row literal, saw: {}", row.lexeme(source)),
            ));
        }
        index += 1;

        if tokens.get(index).map(|t| t.kind) != Some(TokenKind::Comma) {
            return Err(CompileError::at(
                row.line,
                format!("Expected comma after: {}", row.lexeme(source)),
            ));
        }
        index += 1;

        let key = match tokens.get(index) {
            Some(t) if t.kind == TokenKind::KeyLit => *t,
            Some(t) => return Err(CompileError::at(t.line, "Expected key literal")),
            None => return Err(CompileError::at(row.line, "Expected key literal")),
        };
        index += 1;

        if tokens.get(index).map(|t| t.kind) != Some(TokenKind::Colon) {
            return Err(CompileError::at(
                key.line,
                format!("Expected colon after: {}", key.lexeme(source)),
            ));
        }
        index += 1;

        let mut binding = Binding {
            key: key_index(coordinate(source, &row)?, coordinate(source, &key)?),
            runs: BTreeMap::new(),
        };

        let mut is_inline = true;
        while tokens.get(index).is_some_and(|t| t.kind.is_operation()) {
            is_inline = false;
            let operation = tokens[index];
            index += 1;

            if tokens.get(index).map(|t| t.kind) != Some(TokenKind::Colon) {
                return Err(CompileError::at(
                    operation.line,
                    format!("Expected colon after: {}", operation.lexeme(source)),
                ));
            }
            index += 1;

            if index >= tokens.len() {
                return Err(CompileError::at(
                    operation.line,
                    format!(
                        "Expected action definition after: {}",
                        operation.lexeme(source)
                    ),
                ));
            }

            let run = parse_action_run(source, tokens, &mut index)?;
            binding
                .runs
                .insert(operation_from_token(operation.kind), run);
        }

        if is_inline {
            if index >= tokens.len() {
                return Err(CompileError::at(
                    key.line,
                    format!("Expected action definition after: {}", key.lexeme(source)),
                ));
            }
            let run = parse_action_run(source, tokens, &mut index)?;
            binding.runs.insert(Operation::Press, run);
        }

        file.bindings.push(binding);
    }

    Ok(file)
}

/// Extracts one action run, starting at `tokens[*index]`.
///
/// The run consumes while tokens stay in the allowed set; the edge rules
/// reject runs that open with a separator or parameter, close with `,` or
/// `+`, or contain two consecutive `+`.
fn parse_action_run(
    source: &str,
    tokens: &[Token],
    index: &mut usize,
) -> Result<Vec<Token>, CompileError> {
    let head = tokens[*index];
    if head.kind.disallowed_at_run_start() {
        return Err(CompileError::at(
            head.line,
            format!("Token not allowed at start of action: {}", head.lexeme(source)),
        ));
    }
    *index += 1;

    let mut run = vec![head];
    while tokens.get(*index).is_some_and(|t| t.kind.allowed_in_run()) {
        run.push(tokens[*index]);
        *index += 1;
    }

    let last = run[run.len() - 1];
    if last.kind.disallowed_at_run_end() {
        return Err(CompileError::at(
            last.line,
            format!("Token not allowed at end of action: {}", last.lexeme(source)),
        ));
    }

    for pair in run.windows(2) {
        if pair[0].kind == TokenKind::Plus && pair[1].kind == TokenKind::Plus {
            return Err(CompileError::at(
                pair[0].line,
                "Cannot have two consecutive '+'",
            ));
        }
    }

    Ok(run)
}

/// Compiles one `.kmf` source into a layer named `name`.
pub fn compile_layer(name: &str, source: &str) -> Result<Layer, CompileError> {
    let tokens = tokenize(source)?;
    let parsed = parse(source, &tokens)?;

    let mut layer = Layer::new(name);
    for directive in &parsed.directives {
        layer.set_unassigned_keys_fall_through(
            directive.kind == TokenKind::OtherKeysFallThrough,
        );
    }

    for binding in &parsed.bindings {
        for (operation, run) in &binding.runs {
            debug!("building key {} {:?}", binding.key, Debug2Format(operation));
            let action = build_action(source, run, *operation)?;
            layer.bind(binding.key, action, *operation);
        }
    }
    Ok(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{BoundAction, KeyMode, LayerOpKind};
    use crate::layer::layer_id;

    fn parse_source(source: &str) -> Result<ParsedFile, CompileError> {
        parse(source, &tokenize(source).expect("tokenize"))
    }

    #[test]
    fn test_inline_binding_defaults_to_press() {
        let file = parse_source("R0,K1: click A").expect("parse");
        assert!(file.directives.is_empty());
        assert_eq!(file.bindings.len(), 1);
        let binding = &file.bindings[0];
        assert_eq!(binding.key, key_index(0, 1));
        assert!(binding.runs.contains_key(&Operation::Press));
        assert_eq!(binding.runs[&Operation::Press].len(), 2);
    }

    #[test]
    fn test_operation_blocks() {
        let source = "R2,K3: on click: click B\n       on hold: switch to Nav until released";
        let file = parse_source(source).expect("parse");
        let binding = &file.bindings[0];
        assert_eq!(binding.key, key_index(2, 3));
        assert!(binding.runs.contains_key(&Operation::Click));
        assert!(binding.runs.contains_key(&Operation::Hold));
        assert!(!binding.runs.contains_key(&Operation::Press));
    }

    #[test]
    fn test_reserved_operations_still_parse() {
        // The poller never fires these, but the language accepts them.
        let source = "R0,K0: on double-click: click A\n       on release: click B";
        let file = parse_source(source).expect("parse");
        let binding = &file.bindings[0];
        assert!(binding.runs.contains_key(&Operation::DoubleClick));
        assert!(binding.runs.contains_key(&Operation::Release));
    }

    #[test]
    fn test_directives_between_bindings() {
        let source = "other keys fall through\nR0,K0: click A\nblock other keys";
        let file = parse_source(source).expect("parse");
        assert_eq!(file.directives.len(), 2);
        assert_eq!(file.bindings.len(), 1);
    }

    #[test]
    fn test_multiple_bindings_split_on_row_literal() {
        let file = parse_source("R0,K0: click A\nR1,K1: click B").expect("parse");
        assert_eq!(file.bindings.len(), 2);
        assert_eq!(file.bindings[1].key, key_index(1, 1));
    }

    #[test]
    fn test_error_expects_row_literal() {
        let err = parse_source("K0,K0: click A").expect_err("must fail");
        assert_eq!(err.message, "Expected row literal, saw: K0");
    }

    #[test]
    fn test_error_missing_comma() {
        let err = parse_source("R0 K0: click A").expect_err("must fail");
        assert_eq!(err.message, "Expected comma after: R0");
    }

    #[test]
    fn test_error_missing_key_literal() {
        let err = parse_source("R0,R1: click A").expect_err("must fail");
        assert_eq!(err.message, "Expected key literal");
    }

    #[test]
    fn test_error_missing_colon() {
        let err = parse_source("R0,K0 click A").expect_err("must fail");
        assert_eq!(err.message, "Expected colon after: K0");
    }

    #[test]
    fn test_error_missing_action() {
        let err = parse_source("R0,K0:").expect_err("must fail");
        assert_eq!(err.message, "Expected action definition after: K0");

        let err = parse_source("R0,K0: on hold:").expect_err("must fail");
        assert_eq!(err.message, "Expected action definition after: on hold");
    }

    #[test]
    fn test_error_run_cannot_open_with_separator() {
        let err = parse_source("R0,K0: , press A").expect_err("must fail");
        assert_eq!(err.message, "Token not allowed at start of action: ,");

        let err = parse_source("R0,K0: quickly").expect_err("must fail");
        assert_eq!(err.message, "Token not allowed at start of action: quickly");
    }

    #[test]
    fn test_error_run_cannot_close_with_separator() {
        let err = parse_source("R0,K0: press A +").expect_err("must fail");
        assert_eq!(err.message, "Token not allowed at end of action: +");
    }

    #[test]
    fn test_error_double_plus() {
        let err = parse_source("R0,K0: press LEFTCTRL +  + A").expect_err("must fail");
        assert_eq!(err.message, "Cannot have two consecutive '+'");
    }

    #[test]
    fn test_errors_carry_the_offending_line() {
        let source = "R0,K0: click A\nR1,K1: click B\nR2,K2\nR3,K3: click C";
        let err = parse_source(source).expect_err("must fail");
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_compile_simple_click() {
        let _ = lovely_env_logger::try_init_default();
        let layer = compile_layer("Test", "R0,K1: click A").expect("compile");
        assert_eq!(
            layer.action(key_index(0, 1), Operation::Press),
            Some(&BoundAction::Keys {
                mode: KeyMode::Click,
                codes: alloc::vec![0x04],
            })
        );
    }

    #[test]
    fn test_compile_hold_switch() {
        let layer = compile_layer(
            "Test",
            "R2,K3: on hold: switch to NavLayer until released",
        )
        .expect("compile");
        assert!(layer.on_hold_bound());
        assert_eq!(
            layer.action(key_index(2, 3), Operation::Hold),
            Some(&BoundAction::LayerOp {
                kind: LayerOpKind::Temporary,
                target: layer_id("NavLayer"),
            })
        );
    }

    #[test]
    fn test_compile_sequence() {
        let layer =
            compile_layer("Test", "R1,K0: wait 250 ms, click LEFTCTRL + C").expect("compile");
        assert_eq!(
            layer.action(key_index(1, 0), Operation::Press),
            Some(&BoundAction::Sequence(alloc::vec![
                BoundAction::Delay(250),
                BoundAction::Keys {
                    mode: KeyMode::Click,
                    codes: alloc::vec![0xe0, 0x06],
                },
            ]))
        );
    }

    #[test]
    fn test_compile_directives_set_fall_through() {
        let layer = compile_layer("Test", "other keys fall through").expect("compile");
        assert!(layer.unassigned_keys_fall_through());
        let layer = compile_layer("Test", "block other keys").expect("compile");
        assert!(!layer.unassigned_keys_fall_through());
        // The last directive wins.
        let layer =
            compile_layer("Test", "other keys fall through\nblock other keys").expect("compile");
        assert!(!layer.unassigned_keys_fall_through());
    }

    #[test]
    fn test_compile_repeated_binding_keeps_the_first() {
        let source = "R0,K0: click A\nR0,K0: click B";
        let layer = compile_layer("Test", source).expect("compile");
        assert_eq!(
            layer.action(key_index(0, 0), Operation::Press),
            Some(&BoundAction::Keys {
                mode: KeyMode::Click,
                codes: alloc::vec![0x04],
            })
        );
    }
}
