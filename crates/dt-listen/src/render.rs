use dt_core::event::{display_value, Event, Frame, Liveness, Payload};
use std::fmt::Write as _;

pub const LISTENING_BANNER: &str = "Listening for events (Ctrl+C to stop)...";

/// Text block printed for one inbound frame, blank line included.
pub fn render_frame(frame: &Frame) -> String {
    match frame {
        Ok(event) => render_event(event),
        Err(raw) => format!("Raw event: {}\n\n", raw.as_str()),
    }
}

pub fn render_event(event: &Event) -> String {
    let mut out = format!("[{}]", event.kind());
    if let Some(timestamp) = event.timestamp() {
        let _ = write!(out, " {timestamp}");
    }
    out.push('\n');
    match &event.payload {
        Payload::Mapping(map) => {
            for (key, value) in map {
                let _ = writeln!(out, "  {key}: {}", display_value(value));
            }
        }
        Payload::Scalar(value) => {
            let _ = writeln!(out, "  payload: {}", display_value(value));
        }
        Payload::Absent => {}
    }
    out.push('\n');
    out
}

pub fn render_liveness(liveness: &Liveness) -> String {
    match liveness {
        Liveness::Passed => "PING/PONG check passed\n".to_string(),
        Liveness::Failed { reply } => format!("PING/PONG check failed, received: {reply}\n"),
    }
}

pub fn render_binary(len: usize) -> String {
    format!("Binary event: {len} bytes\n\n")
}
