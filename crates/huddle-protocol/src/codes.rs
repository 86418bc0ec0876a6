//! Error codes carried by `Error` frames.

/// The request was malformed or a field failed validation.
pub const INVALID_ARGUMENT: u16 = 1001;
/// The session has not completed the `Connect` handshake.
pub const UNAUTHENTICATED: u16 = 1002;
/// The client speaks an incompatible protocol version.
pub const UNSUPPORTED_VERSION: u16 = 1003;
/// A frame the server does not accept from clients.
pub const UNEXPECTED_FRAME: u16 = 1004;
/// The server cannot accept more sessions.
pub const UNAVAILABLE: u16 = 1005;

/// Room name already taken.
pub const ALREADY_EXISTS: u16 = 2001;
/// Room does not exist.
pub const NOT_FOUND: u16 = 2002;
/// User already subscribed to the room.
pub const ALREADY_MEMBER: u16 = 2003;
/// User not subscribed to the room.
pub const NOT_MEMBER: u16 = 2004;
/// No connected user or room matches the destination.
pub const DESTINATION_NOT_FOUND: u16 = 2005;
/// The recipient's queue is full; retry later.
pub const BACKPRESSURE: u16 = 2006;

/// Human-readable name for a code, if known.
#[must_use]
pub fn name(code: u16) -> Option<&'static str> {
    Some(match code {
        INVALID_ARGUMENT => "invalid_argument",
        UNAUTHENTICATED => "unauthenticated",
        UNSUPPORTED_VERSION => "unsupported_version",
        UNEXPECTED_FRAME => "unexpected_frame",
        UNAVAILABLE => "unavailable",
        ALREADY_EXISTS => "already_exists",
        NOT_FOUND => "not_found",
        ALREADY_MEMBER => "already_member",
        NOT_MEMBER => "not_member",
        DESTINATION_NOT_FOUND => "destination_not_found",
        BACKPRESSURE => "backpressure",
        _ => return None,
    })
}
