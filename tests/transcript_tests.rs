// Tests for partial/final transcript state and the wire message types.

use lingo_voice::stt::{ControlMessage, ServerMessage, TranscriptState};

fn partial(text: &str) -> ServerMessage {
    ServerMessage::Partial {
        text: text.to_string(),
    }
}

fn final_msg(text: &str) -> ServerMessage {
    ServerMessage::Final {
        text: text.to_string(),
    }
}

#[test]
fn test_partial_then_final_commits_and_clears() {
    let mut state = TranscriptState::new();
    state.apply(&partial("he"));
    state.apply(&partial("hello"));
    state.apply(&final_msg("hello there"));

    assert_eq!(state.partial, "");
    assert_eq!(state.final_text, "hello there");
    assert_eq!(state.full_text(), "hello there");
}

#[test]
fn test_full_text_joins_final_and_partial() {
    let mut state = TranscriptState::new();
    state.apply(&final_msg("hi"));
    state.apply(&partial("how"));

    assert_eq!(state.full_text(), "hi how");
    assert_eq!(state.final_text, "hi");
    assert_eq!(state.partial, "how");
}

#[test]
fn test_partial_replaced_wholesale() {
    let mut state = TranscriptState::new();
    state.apply(&partial("first hypothesis"));
    state.apply(&partial("second"));
    assert_eq!(state.partial, "second");
}

#[test]
fn test_finals_append_space_joined() {
    let mut state = TranscriptState::new();
    state.apply(&final_msg("one"));
    state.apply(&final_msg("two"));
    state.apply(&final_msg("three"));
    assert_eq!(state.final_text, "one two three");
}

#[test]
fn test_final_trims_whitespace() {
    let mut state = TranscriptState::new();
    state.apply(&final_msg("  padded  "));
    assert_eq!(state.final_text, "padded");
}

#[test]
fn test_error_message_leaves_state_untouched() {
    let mut state = TranscriptState::new();
    state.apply(&partial("speaking"));
    let committed = state.apply(&ServerMessage::Error {
        message: "recognizer hiccup".to_string(),
    });
    assert!(!committed);
    assert_eq!(state.partial, "speaking");
    assert_eq!(state.final_text, "");
}

#[test]
fn test_apply_reports_commit() {
    let mut state = TranscriptState::new();
    assert!(!state.apply(&partial("x")));
    assert!(state.apply(&final_msg("x")));
}

#[test]
fn test_empty_state() {
    let state = TranscriptState::new();
    assert!(state.is_empty());
    assert_eq!(state.full_text(), "");
}

#[test]
fn test_server_message_parsing() {
    let msg: ServerMessage = serde_json::from_str(r#"{"type":"partial","text":"xin chào"}"#).unwrap();
    assert_eq!(
        msg,
        ServerMessage::Partial {
            text: "xin chào".to_string()
        }
    );

    let msg: ServerMessage = serde_json::from_str(r#"{"type":"final","text":"done"}"#).unwrap();
    assert_eq!(
        msg,
        ServerMessage::Final {
            text: "done".to_string()
        }
    );

    let msg: ServerMessage =
        serde_json::from_str(r#"{"type":"error","message":"bad frame"}"#).unwrap();
    assert_eq!(
        msg,
        ServerMessage::Error {
            message: "bad frame".to_string()
        }
    );
}

#[test]
fn test_finalize_command_wire_format() {
    let encoded = serde_json::to_string(&ControlMessage::Finalize).unwrap();
    assert_eq!(encoded, r#"{"command":"finalize"}"#);
}
