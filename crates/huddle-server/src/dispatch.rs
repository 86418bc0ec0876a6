//! Request dispatch: decoded frames in, router calls, reply frames out.
//!
//! Validation of names and message size happens here, before the router
//! is consulted. Domain errors are mapped onto protocol error codes.

use crate::config::LimitsConfig;
use crate::metrics;
use huddle_core::{ChatError, ChatKind, Delivery, Destination, Message, Router};
use huddle_protocol::{codes, ChannelEntry, ChannelKind, Frame};
use tracing::{debug, warn};

/// Maximum room or user name length.
pub const MAX_NAME_LENGTH: usize = 256;

/// Validate a room or user name.
///
/// # Errors
///
/// Returns an error message if the name is invalid.
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("Name cannot be empty");
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err("Name too long");
    }
    if name.starts_with('$') {
        return Err("Names starting with '$' are reserved");
    }
    if !name.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        return Err("Name contains invalid characters");
    }
    Ok(())
}

/// Protocol code for a domain error.
#[must_use]
pub fn error_code(err: &ChatError) -> u16 {
    match err {
        ChatError::AlreadyExists(_) => codes::ALREADY_EXISTS,
        ChatError::NotFound(_) => codes::NOT_FOUND,
        ChatError::AlreadyMember { .. } => codes::ALREADY_MEMBER,
        ChatError::NotMember { .. } => codes::NOT_MEMBER,
        ChatError::DestinationNotFound(_) => codes::DESTINATION_NOT_FOUND,
        ChatError::Backpressure(_) => codes::BACKPRESSURE,
    }
}

#[must_use]
pub fn wire_kind(kind: ChatKind) -> ChannelKind {
    match kind {
        ChatKind::Direct => ChannelKind::Direct,
        ChatKind::Group => ChannelKind::Group,
    }
}

#[must_use]
pub fn chat_kind(kind: ChannelKind) -> ChatKind {
    match kind {
        ChannelKind::Direct => ChatKind::Direct,
        ChannelKind::Group => ChatKind::Group,
    }
}

/// Frame pushed to a client for a queued delivery.
#[must_use]
pub fn delivery_frame(delivery: &Delivery) -> Frame {
    Frame::Message {
        id: delivery.id,
        from: delivery.from.clone(),
        to: delivery.destination.name().to_string(),
        kind: wire_kind(delivery.kind()),
        body: delivery.body.clone(),
        timestamp: delivery.timestamp,
    }
}

/// Build an `Error` frame, counting it under the code's name.
#[must_use]
pub fn error_frame(id: u64, code: u16, message: impl Into<String>) -> Frame {
    metrics::record_error(codes::name(code).unwrap_or("unknown"));
    Frame::error(id, code, message)
}

fn invalid(id: u64, field: &str, reason: &str) -> Frame {
    error_frame(id, codes::INVALID_ARGUMENT, format!("{field}: {reason}"))
}

fn rejected(id: u64, err: &ChatError) -> Frame {
    metrics::record_error(err.kind());
    Frame::error(id, error_code(err), err.to_string())
}

fn outcome(id: u64, result: Result<(), ChatError>) -> Frame {
    match result {
        Ok(()) => Frame::ack(id),
        Err(err) => rejected(id, &err),
    }
}

/// Handle one frame from an authenticated session.
///
/// Returns the reply to send back, if any.
pub async fn dispatch(
    router: &Router,
    limits: &LimitsConfig,
    user: &str,
    frame: Frame,
) -> Option<Frame> {
    match frame {
        Frame::CreateGroupChat { id, channel } => {
            metrics::record_request("create_group_chat");
            if let Err(reason) = validate_name(&channel) {
                return Some(invalid(id, "channel", reason));
            }
            let reply = outcome(id, router.create_group_chat(&channel, user));
            metrics::set_active_rooms(router.registry().room_count());
            Some(reply)
        }

        Frame::JoinGroupChat { id, channel } => {
            metrics::record_request("join_group_chat");
            if let Err(reason) = validate_name(&channel) {
                return Some(invalid(id, "channel", reason));
            }
            Some(outcome(id, router.join_group_chat(&channel, user)))
        }

        Frame::LeaveGroupChat { id, channel } => {
            metrics::record_request("leave_group_chat");
            if let Err(reason) = validate_name(&channel) {
                return Some(invalid(id, "channel", reason));
            }
            let reply = outcome(id, router.leave_group_chat(&channel, user));
            metrics::set_active_rooms(router.registry().room_count());
            Some(reply)
        }

        Frame::ListChannels { id } => {
            metrics::record_request("list_channels");
            let items = router
                .list_channels()
                .into_iter()
                .map(|info| ChannelEntry {
                    name: info.name,
                    kind: wire_kind(info.kind),
                })
                .collect();
            Some(Frame::Channels { id, items })
        }

        Frame::SendMessage { id, to, kind, body } => {
            metrics::record_request("send_message");
            if let Err(reason) = validate_name(&to) {
                return Some(invalid(id, "to", reason));
            }
            if body.len() > limits.max_message_size {
                return Some(invalid(id, "body", "Message too large"));
            }

            let message = Message::new(Destination::new(chat_kind(kind), to), body);
            match router.send_message(message, user).await {
                Ok(report) => {
                    metrics::record_dropped(report.dropped);
                    debug!(
                        user = %user,
                        request = id,
                        delivered = report.delivered,
                        "Message routed"
                    );
                    Some(Frame::ack(id))
                }
                Err(err) => Some(rejected(id, &err)),
            }
        }

        Frame::Ping { timestamp } => Some(Frame::pong(timestamp)),

        Frame::Pong { .. } => None,

        other => {
            warn!(user = %user, frame_type = ?other.frame_type(), "Unexpected frame type");
            Some(error_frame(
                0,
                codes::UNEXPECTED_FRAME,
                format!("Unexpected frame: {:?}", other.frame_type()),
            ))
        }
    }
}
