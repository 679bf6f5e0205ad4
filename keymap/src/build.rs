//! Action construction.
//!
//! Takes one parsed action run plus the operation it will bind to and
//! produces a typed [`BoundAction`]. The run splits on top-level commas
//! into clauses; more than one clause wraps into a `Sequence`.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::action::{BoundAction, KeyMode, LayerOpKind, MouseAxis};
use crate::keys;
use crate::layer::{layer_id, Operation, BASE_LAYER};
use crate::token::{token_run_str, CompileError, Token, TokenKind};

/// Keystroke cadence when a `type` action names no speed, in ms.
const DEFAULT_TYPE_DELAY_MS: u32 = 10;
const SLOW_TYPE_DELAY_MS: u32 = 200;
const HUMAN_TYPE_DELAY_MS: u32 = 50;

/// Builds the action bound by `run` under `operation`.
pub fn build_action(
    source: &str,
    run: &[Token],
    operation: Operation,
) -> Result<BoundAction, CompileError> {
    let mut actions: Vec<BoundAction> = Vec::new();
    for clause in run.split(|t| t.kind == TokenKind::Comma) {
        actions.push(build_clause(source, clause, run, operation)?);
    }
    if actions.len() == 1 {
        Ok(actions.swap_remove(0))
    } else {
        Ok(BoundAction::Sequence(actions))
    }
}

/// Builds one comma-delimited clause. The first token selects the variant;
/// a clause with no action tag is a bare key list.
fn build_clause(
    source: &str,
    clause: &[Token],
    run: &[Token],
    operation: Operation,
) -> Result<BoundAction, CompileError> {
    let Some(head) = clause.first() else {
        return Err(CompileError::at(run[0].line, "Empty action clause"));
    };
    let rest = &clause[1..];

    match head.kind {
        TokenKind::ActPress => key_action(source, head, rest, KeyMode::Press, "Press"),
        TokenKind::ActRelease => key_action(source, head, rest, KeyMode::Release, "Release"),
        TokenKind::ActClick => key_action(source, head, rest, KeyMode::Click, "Click"),
        TokenKind::ActWait => {
            if clause.len() != 3 {
                return Err(CompileError::at(
                    head.line,
                    "Wait action requires 2 parameters",
                ));
            }
            Ok(BoundAction::Delay(parse_time(source, rest)?))
        }
        TokenKind::ActSwitchTo => build_switch_to(source, clause, operation),
        TokenKind::ActToggle => layer_action(source, clause, LayerOpKind::Toggle, "Toggle"),
        TokenKind::ActLeave => layer_action(source, clause, LayerOpKind::Leave, "Leave"),
        TokenKind::ActType => build_typer(source, clause),
        TokenKind::ActResetKeyboard => {
            nullary(head, clause, BoundAction::ResetKeeb, "Reset Keyboard")
        }
        TokenKind::ActBootloader => nullary(head, clause, BoundAction::Bootloader, "Bootloader"),
        TokenKind::ActHome => nullary(
            head,
            clause,
            BoundAction::LayerOp {
                kind: LayerOpKind::Home,
                target: layer_id(BASE_LAYER),
            },
            "Home",
        ),
        TokenKind::ActNothing => nullary(head, clause, BoundAction::Nothing, "Nothing"),
        TokenKind::ActPassThrough => {
            nullary(head, clause, BoundAction::PassThrough, "Pass through")
        }
        TokenKind::ActReloadKeyMaps => {
            nullary(head, clause, BoundAction::ReloadKeymaps, "Reload Key Maps")
        }
        TokenKind::ActMouseMoveUp
        | TokenKind::ActMouseMoveDown
        | TokenKind::ActMouseMoveLeft
        | TokenKind::ActMouseMoveRight => build_mouse_move(source, clause),
        TokenKind::ActMouseScrollUp
        | TokenKind::ActMouseScrollDown
        | TokenKind::ActMouseScrollLeft
        | TokenKind::ActMouseScrollRight => build_mouse_scroll(source, clause),
        TokenKind::ActMouseClickLeft
        | TokenKind::ActMouseClickRight
        | TokenKind::ActMouseClickCenter
        | TokenKind::ActMouseClickBackwards
        | TokenKind::ActMouseClickForwards => build_mouse_click(head, clause),
        _ => Ok(BoundAction::Keys {
            mode: KeyMode::Generic,
            codes: parse_key_codes(source, clause)?,
        }),
    }
}

fn key_action(
    source: &str,
    head: &Token,
    rest: &[Token],
    mode: KeyMode,
    verb: &str,
) -> Result<BoundAction, CompileError> {
    if rest.is_empty() {
        return Err(CompileError::at(
            head.line,
            format!("{verb} action requires key parameter"),
        ));
    }
    Ok(BoundAction::Keys {
        mode,
        codes: parse_key_codes(source, rest)?,
    })
}

fn nullary(
    head: &Token,
    clause: &[Token],
    action: BoundAction,
    verb: &str,
) -> Result<BoundAction, CompileError> {
    if clause.len() != 1 {
        return Err(CompileError::at(
            head.line,
            format!("{verb} action shouldn't have any parameters"),
        ));
    }
    Ok(action)
}

fn build_switch_to(
    source: &str,
    clause: &[Token],
    operation: Operation,
) -> Result<BoundAction, CompileError> {
    let head = &clause[0];
    if clause.len() == 1 {
        return Err(CompileError::at(
            head.line,
            "Switch to action requires layer parameter",
        ));
    }

    let last = &clause[clause.len() - 1];
    if last.kind == TokenKind::ParamUntilReleased {
        if clause.len() == 2 {
            return Err(CompileError::at(
                head.line,
                format!(
                    "Missing layer name for temporary switch: '{}'",
                    token_run_str(source, head, last)
                ),
            ));
        }
        if operation != Operation::Hold {
            return Err(CompileError::at(
                head.line,
                "TemporaryLayerAction can only bind to On Hold",
            ));
        }
        let name = token_run_str(source, &clause[1], &clause[clause.len() - 2]);
        return Ok(BoundAction::LayerOp {
            kind: LayerOpKind::Temporary,
            target: layer_id(name),
        });
    }

    let name = token_run_str(source, &clause[1], last);
    Ok(BoundAction::LayerOp {
        kind: LayerOpKind::SwitchTo,
        target: layer_id(name),
    })
}

fn layer_action(
    source: &str,
    clause: &[Token],
    kind: LayerOpKind,
    verb: &str,
) -> Result<BoundAction, CompileError> {
    let head = &clause[0];
    if clause.len() == 1 {
        return Err(CompileError::at(
            head.line,
            format!("{verb} action requires layer parameter"),
        ));
    }
    let name = token_run_str(source, &clause[1], &clause[clause.len() - 1]);
    Ok(BoundAction::LayerOp {
        kind,
        target: layer_id(name),
    })
}

fn build_typer(source: &str, clause: &[Token]) -> Result<BoundAction, CompileError> {
    let head = &clause[0];
    if clause.len() == 1 {
        return Err(CompileError::at(
            head.line,
            "Type action missing text parameter",
        ));
    }

    let text = &clause[1];
    if text.kind != TokenKind::StringLit {
        return Err(CompileError::at(
            head.line,
            "Type action's first parameter must be quoted text",
        ));
    }

    let lexeme = text.lexeme(source);
    let payload = lexeme[1..lexeme.len() - 1]
        .replace("[DOUBLE QUOTES]", "\"")
        .replace("[SINGLE QUOTE]", "'")
        .replace("[RETURN]", "\n");

    let mut delay = DEFAULT_TYPE_DELAY_MS;
    let mut repeating = false;
    let mut speed_directives = 0;
    let mut time_tokens: Vec<Token> = Vec::new();

    for token in &clause[2..] {
        match token.kind {
            TokenKind::ParamRepeatedly => repeating = true,
            TokenKind::ParamSlowly => {
                delay = SLOW_TYPE_DELAY_MS;
                speed_directives += 1;
            }
            TokenKind::ParamQuickly => {
                delay = 0;
                speed_directives += 1;
            }
            TokenKind::ParamAtHumanSpeed => {
                delay = HUMAN_TYPE_DELAY_MS;
                speed_directives += 1;
            }
            TokenKind::NumLit
            | TokenKind::ParamTimeMs
            | TokenKind::ParamTimeSec
            | TokenKind::ParamTimeMin => time_tokens.push(*token),
            _ => {}
        }
    }

    match time_tokens.len() {
        0 => {}
        2 => {
            delay = parse_time(source, &time_tokens)?;
            speed_directives += 1;
        }
        _ => {
            return Err(CompileError::at(
                head.line,
                "Incorrect number of time tokens provided",
            ));
        }
    }

    if speed_directives > 1 {
        return Err(CompileError::at(
            head.line,
            format!(
                "Multiple speeds set for Type action. Please select one.\n\t{}",
                token_run_str(source, head, &clause[clause.len() - 1])
            ),
        ));
    }

    Ok(BoundAction::Typer {
        payload,
        keystroke_delay: delay,
        repeat_delay: 0,
        repeating,
    })
}

fn mouse_speed(source: &str, clause: &[Token], what: &str) -> Result<i8, CompileError> {
    let head = &clause[0];
    if clause.len() != 2 {
        return Err(CompileError::at(
            head.line,
            format!("Mouse {what} action requires distance parameter (0-100)"),
        ));
    }
    let speed = &clause[1];
    if speed.kind != TokenKind::NumLit {
        return Err(CompileError::at(
            speed.line,
            format!("Expected speed for mouse {what}"),
        ));
    }
    match speed.lexeme(source).parse::<u32>() {
        Ok(value) if value <= 100 => Ok(value as i8),
        _ => Err(CompileError::at(speed.line, "Speed must be in range 0-100")),
    }
}

fn build_mouse_move(source: &str, clause: &[Token]) -> Result<BoundAction, CompileError> {
    let kind = clause[0].kind;
    let speed = mouse_speed(source, clause, "move")?;
    let axis = match kind {
        TokenKind::ActMouseMoveUp | TokenKind::ActMouseMoveDown => MouseAxis::UpDown,
        _ => MouseAxis::LeftRight,
    };
    // Up and left move negative.
    let signed = match kind {
        TokenKind::ActMouseMoveUp | TokenKind::ActMouseMoveLeft => -speed,
        _ => speed,
    };
    Ok(BoundAction::MouseMove {
        axis,
        speed: signed,
    })
}

fn build_mouse_scroll(source: &str, clause: &[Token]) -> Result<BoundAction, CompileError> {
    let kind = clause[0].kind;
    let speed = mouse_speed(source, clause, "scroll")?;
    let axis = match kind {
        TokenKind::ActMouseScrollUp | TokenKind::ActMouseScrollDown => MouseAxis::UpDown,
        _ => MouseAxis::LeftRight,
    };
    // Scroll flips the convention: down and left are negative.
    let signed = match kind {
        TokenKind::ActMouseScrollDown | TokenKind::ActMouseScrollLeft => -speed,
        _ => speed,
    };
    Ok(BoundAction::MouseScroll {
        axis,
        speed: signed,
    })
}

fn build_mouse_click(head: &Token, clause: &[Token]) -> Result<BoundAction, CompileError> {
    if clause.len() != 1 {
        return Err(CompileError::at(
            head.line,
            "Mouse click should have 1 parameter",
        ));
    }
    let buttons = match head.kind {
        TokenKind::ActMouseClickLeft => 1,
        TokenKind::ActMouseClickRight => 2,
        TokenKind::ActMouseClickCenter => 4,
        TokenKind::ActMouseClickBackwards => 8,
        _ => 16,
    };
    Ok(BoundAction::MouseClick { buttons })
}

/// Parses `(number, unit)` into milliseconds.
fn parse_time(source: &str, tokens: &[Token]) -> Result<u32, CompileError> {
    if tokens.len() != 2 {
        let line = tokens.first().map_or(0, |t| t.line);
        return Err(CompileError::at(
            line,
            format!("Expected 2 time parameters, saw: {}", tokens.len()),
        ));
    }

    let duration = &tokens[0];
    let units = &tokens[1];

    if duration.kind != TokenKind::NumLit {
        return Err(CompileError::at(
            duration.line,
            "Expected number in time literal",
        ));
    }
    let time: u32 = duration
        .lexeme(source)
        .parse()
        .map_err(|_| CompileError::at(duration.line, "Time literal out of range"))?;

    match units.kind {
        TokenKind::ParamTimeMs => Ok(time),
        TokenKind::ParamTimeSec => Ok(time.saturating_mul(1_000)),
        TokenKind::ParamTimeMin => Ok(time.saturating_mul(60_000)),
        _ => Err(CompileError::at(units.line, "Expected units in time literal")),
    }
}

/// Parses a key list. Groups split on `+`; a group is either one hex
/// literal or a symbolic name assembled from its concatenated lexemes.
fn parse_key_codes(source: &str, tokens: &[Token]) -> Result<Vec<u8>, CompileError> {
    let mut codes = Vec::new();

    for group in tokens.split(|t| t.kind == TokenKind::Plus) {
        let Some(first) = group.first() else {
            return Err(CompileError::at(tokens[0].line, "Invalid Action or Key: '+'"));
        };

        if first.kind == TokenKind::HexLit {
            if group.len() != 1 {
                return Err(CompileError::at(
                    first.line,
                    "Hex literals must be separated by '+'",
                ));
            }
            let value = u32::from_str_radix(&first.lexeme(source)[2..], 16)
                .map_err(|_| CompileError::at(first.line, "Hex literal out of range"))?;
            codes.push(value as u8);
            continue;
        }

        let mut name = String::new();
        for token in group {
            name.push_str(token.lexeme(source));
        }
        match keys::lookup(&name) {
            Some(code) => codes.push(code),
            None => {
                return Err(CompileError::at(
                    first.line,
                    format!("Invalid Action or Key: '{}'", first.lexeme(source)),
                ));
            }
        }
    }

    Ok(codes)
}
