//! # Remote Error Codes
//!
//! Every operation result coming back from a session carries a raw `u32`
//! status code. The code packs three fields:
//!
//! ```text
//!  31      28 27      24 23      16 15                    0
//! +----------+----------+----------+-----------------------+
//! |  origin  | severity | reserved |         code          |
//! +----------+----------+----------+-----------------------+
//! ```
//!
//! [`classify`] turns a code into either success (severity `info`) or a
//! [`RemoteError`]. Classification is a pure function: the origin selects a
//! family, and a fixed table inside the family picks the specific
//! [`ErrorKind`]. Codes the table does not know fall back to the family's
//! generic kind, and unknown origins fall back to [`ErrorKind::Unknown`].

use serde::{Deserialize, Serialize};
use std::fmt;

const ORIGIN_MASK: u32 = 0xF000_0000;
const SEVERITY_MASK: u32 = 0x0F00_0000;
const CODE_MASK: u32 = 0x0000_FFFF;

/// Where an error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    RemoteSystem,
    LocalSystem,
    Connection,
    Input,
    Operation,
    Protocol,
    /// Bits that match none of the known origins.
    Unknown,
}

impl Origin {
    fn bits(self) -> u32 {
        match self {
            Origin::RemoteSystem => 0xF000_0000,
            Origin::LocalSystem => 0xE000_0000,
            Origin::Connection => 0xD000_0000,
            Origin::Input => 0xC000_0000,
            Origin::Operation => 0xB000_0000,
            Origin::Protocol => 0xA000_0000,
            Origin::Unknown => 0,
        }
    }

    fn from_bits(bits: u32) -> Self {
        match bits & ORIGIN_MASK {
            0xF000_0000 => Origin::RemoteSystem,
            0xE000_0000 => Origin::LocalSystem,
            0xD000_0000 => Origin::Connection,
            0xC000_0000 => Origin::Input,
            0xB000_0000 => Origin::Operation,
            0xA000_0000 => Origin::Protocol,
            _ => Origin::Unknown,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Origin::RemoteSystem => "remote system",
            Origin::LocalSystem => "local system",
            Origin::Connection => "connection",
            Origin::Input => "input",
            Origin::Operation => "operation",
            Origin::Protocol => "protocol",
            Origin::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Unrecoverable,
}

impl Severity {
    fn bits(self) -> u32 {
        match self {
            Severity::Info => 0x0000_0000,
            Severity::Warning => 0x0100_0000,
            Severity::Error => 0x0200_0000,
            Severity::Unrecoverable => 0x0300_0000,
        }
    }

    fn from_bits(bits: u32) -> Self {
        match bits & SEVERITY_MASK {
            0x0000_0000 => Severity::Info,
            0x0100_0000 => Severity::Warning,
            0x0200_0000 => Severity::Error,
            // 0x03 and anything above it are treated as fatal
            _ => Severity::Unrecoverable,
        }
    }
}

/// A raw status code as reported by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(pub u32);

const fn make(origin: u32, severity: u32, code: u32) -> ErrorCode {
    ErrorCode(origin | severity | code)
}

// origin and severity bits, spelled out so the table below stays const
const O_REMOTE: u32 = 0xF000_0000;
const O_LOCAL: u32 = 0xE000_0000;
const O_CONNECTION: u32 = 0xD000_0000;
const O_INPUT: u32 = 0xC000_0000;
const O_OPERATION: u32 = 0xB000_0000;
const O_PROTOCOL: u32 = 0xA000_0000;
const S_INFO: u32 = 0x0000_0000;
const S_WARNING: u32 = 0x0100_0000;
const S_ERROR: u32 = 0x0200_0000;
const S_UNRECOVERABLE: u32 = 0x0300_0000;

impl ErrorCode {
    pub const OK: ErrorCode = ErrorCode(0);
    pub const OK_CREATED: ErrorCode = make(O_OPERATION, S_INFO, 0x0032);
    pub const UNMATCHED_CONTENT: ErrorCode = make(O_OPERATION, S_INFO, 0x001E);
    pub const ELEMENT_NOT_FOUND: ErrorCode = make(O_OPERATION, S_INFO, 0x0025);

    pub const SYSTEM_REMOTE: ErrorCode = make(O_REMOTE, S_UNRECOVERABLE, 0x0001);
    pub const INTERNAL_REMOTE: ErrorCode = make(O_REMOTE, S_UNRECOVERABLE, 0x0002);
    pub const NO_MEMORY_REMOTE: ErrorCode = make(O_REMOTE, S_UNRECOVERABLE, 0x0003);
    pub const NOT_IMPLEMENTED: ErrorCode = make(O_REMOTE, S_UNRECOVERABLE, 0x0011);

    pub const SYSTEM_LOCAL: ErrorCode = make(O_LOCAL, S_UNRECOVERABLE, 0x0001);
    pub const INTERNAL_LOCAL: ErrorCode = make(O_LOCAL, S_UNRECOVERABLE, 0x0002);
    pub const NO_MEMORY_LOCAL: ErrorCode = make(O_LOCAL, S_UNRECOVERABLE, 0x0003);

    pub const HOST_NOT_FOUND: ErrorCode = make(O_CONNECTION, S_ERROR, 0x0005);
    pub const TIMEOUT: ErrorCode = make(O_CONNECTION, S_ERROR, 0x000A);
    pub const CONNECTION_REFUSED: ErrorCode = make(O_CONNECTION, S_UNRECOVERABLE, 0x000E);
    pub const CONNECTION_RESET: ErrorCode = make(O_CONNECTION, S_ERROR, 0x000F);
    pub const NOT_CONNECTED: ErrorCode = make(O_CONNECTION, S_ERROR, 0x001B);

    pub const BUFFER_TOO_SMALL: ErrorCode = make(O_INPUT, S_WARNING, 0x000B);
    pub const INVALID_ARGUMENT: ErrorCode = make(O_INPUT, S_ERROR, 0x0018);
    pub const OUT_OF_BOUNDS: ErrorCode = make(O_INPUT, S_WARNING, 0x0019);
    pub const RESERVED_ALIAS: ErrorCode = make(O_INPUT, S_ERROR, 0x001D);
    pub const ENTRY_TOO_LARGE: ErrorCode = make(O_INPUT, S_ERROR, 0x002B);
    pub const ALIAS_TOO_LONG: ErrorCode = make(O_INPUT, S_ERROR, 0x0035);

    pub const ALIAS_NOT_FOUND: ErrorCode = make(O_OPERATION, S_WARNING, 0x0008);
    pub const ALIAS_ALREADY_EXISTS: ErrorCode = make(O_OPERATION, S_WARNING, 0x0009);
    pub const CONFLICT: ErrorCode = make(O_OPERATION, S_ERROR, 0x001A);
    pub const INCOMPATIBLE_TYPE: ErrorCode = make(O_OPERATION, S_WARNING, 0x0022);
    pub const OVERFLOW: ErrorCode = make(O_OPERATION, S_WARNING, 0x0027);
    pub const UNDERFLOW: ErrorCode = make(O_OPERATION, S_WARNING, 0x0028);
    pub const RESOURCE_LOCKED: ErrorCode = make(O_OPERATION, S_ERROR, 0x002D);
    pub const OPERATION_DISABLED: ErrorCode = make(O_OPERATION, S_ERROR, 0x002E);
    pub const OPERATION_NOT_PERMITTED: ErrorCode = make(O_OPERATION, S_ERROR, 0x002F);

    pub const INVALID_PROTOCOL: ErrorCode = make(O_PROTOCOL, S_UNRECOVERABLE, 0x0004);
    pub const UNEXPECTED_REPLY: ErrorCode = make(O_PROTOCOL, S_UNRECOVERABLE, 0x0006);
    pub const INVALID_VERSION: ErrorCode = make(O_PROTOCOL, S_UNRECOVERABLE, 0x0016);

    pub fn new(origin: Origin, severity: Severity, code: u16) -> Self {
        ErrorCode(origin.bits() | severity.bits() | u32::from(code))
    }

    pub fn origin(self) -> Origin {
        Origin::from_bits(self.0)
    }

    pub fn severity(self) -> Severity {
        Severity::from_bits(self.0)
    }

    /// The low 16 bits, without origin and severity.
    pub fn code(self) -> u16 {
        (self.0 & CODE_MASK) as u16
    }

    pub fn is_success(self) -> bool {
        self.severity() == Severity::Info
    }

    /// Built-in description, used when a session reports no message.
    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::OK => "success",
            ErrorCode::OK_CREATED => "success, entry created",
            ErrorCode::UNMATCHED_CONTENT => "the content did not match the comparand",
            ErrorCode::ELEMENT_NOT_FOUND => "element not found",
            ErrorCode::SYSTEM_REMOTE => "remote system error",
            ErrorCode::INTERNAL_REMOTE => "remote internal error",
            ErrorCode::NO_MEMORY_REMOTE => "remote host is out of memory",
            ErrorCode::NOT_IMPLEMENTED => "operation not implemented by the remote host",
            ErrorCode::SYSTEM_LOCAL => "local system error",
            ErrorCode::INTERNAL_LOCAL => "local internal error",
            ErrorCode::NO_MEMORY_LOCAL => "local host is out of memory",
            ErrorCode::HOST_NOT_FOUND => "host not found",
            ErrorCode::TIMEOUT => "operation timed out",
            ErrorCode::CONNECTION_REFUSED => "connection refused",
            ErrorCode::CONNECTION_RESET => "connection reset by peer",
            ErrorCode::NOT_CONNECTED => "not connected",
            ErrorCode::BUFFER_TOO_SMALL => "buffer too small",
            ErrorCode::INVALID_ARGUMENT => "invalid argument",
            ErrorCode::OUT_OF_BOUNDS => "argument out of bounds",
            ErrorCode::RESERVED_ALIAS => "alias is in a reserved namespace",
            ErrorCode::ENTRY_TOO_LARGE => "entry too large",
            ErrorCode::ALIAS_TOO_LONG => "alias too long",
            ErrorCode::ALIAS_NOT_FOUND => "alias not found",
            ErrorCode::ALIAS_ALREADY_EXISTS => "alias already exists",
            ErrorCode::CONFLICT => "conflicting operation",
            ErrorCode::INCOMPATIBLE_TYPE => "entry has an incompatible type",
            ErrorCode::OVERFLOW => "overflow",
            ErrorCode::UNDERFLOW => "underflow",
            ErrorCode::RESOURCE_LOCKED => "resource locked",
            ErrorCode::OPERATION_DISABLED => "operation disabled",
            ErrorCode::OPERATION_NOT_PERMITTED => "operation not permitted",
            ErrorCode::INVALID_PROTOCOL => "invalid protocol",
            ErrorCode::UNEXPECTED_REPLY => "unexpected reply",
            ErrorCode::INVALID_VERSION => "invalid protocol version",
            _ => "unknown error",
        }
    }
}

impl From<u32> for ErrorCode {
    fn from(raw: u32) -> Self {
        ErrorCode(raw)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// The classified kind of a failed remote operation.
///
/// The generic per-family kinds (`Input`, `Operation`, ...) are produced for
/// codes the family table does not map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // input
    ReservedAlias,
    InvalidArgument,
    OutOfBounds,
    AliasTooLong,
    EntryTooLarge,
    BufferTooSmall,
    Input,
    // operation
    AliasNotFound,
    AliasAlreadyExists,
    IncompatibleType,
    OperationDisabled,
    OperationNotPermitted,
    Overflow,
    Underflow,
    ResourceLocked,
    Conflict,
    Operation,
    // connection
    ConnectionRefused,
    ConnectionReset,
    HostNotFound,
    Timeout,
    NotConnected,
    Connection,
    // protocol
    UnexpectedReply,
    InvalidProtocol,
    InvalidVersion,
    Protocol,
    // system
    OutOfMemory,
    NotImplemented,
    LocalSystem,
    RemoteSystem,
    Unknown,
}

/// A failed operation: the raw code, its decoded origin, the classified kind
/// and a human readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub origin: Origin,
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub message: String,
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({} error {}): {}", self.kind, self.origin, self.code, self.message)
    }
}

impl std::error::Error for RemoteError {}

/// Classify a raw code. Severity `info` is success; everything else becomes a
/// [`RemoteError`]. An empty `message` is replaced by the code's built-in
/// description.
pub fn classify(code: ErrorCode, message: &str) -> Result<(), RemoteError> {
    if code.is_success() {
        return Ok(());
    }

    let origin = code.origin();
    let kind = match origin {
        Origin::Input => classify_input(code),
        Origin::Operation => classify_operation(code),
        Origin::Connection => classify_connection(code),
        Origin::Protocol => classify_protocol(code),
        Origin::LocalSystem => classify_system(code, ErrorKind::LocalSystem),
        Origin::RemoteSystem => classify_system(code, ErrorKind::RemoteSystem),
        Origin::Unknown => ErrorKind::Unknown,
    };

    let message = if message.is_empty() {
        code.description().to_string()
    } else {
        message.to_string()
    };

    Err(RemoteError {
        origin,
        kind,
        code,
        message,
    })
}

fn classify_input(code: ErrorCode) -> ErrorKind {
    match code {
        ErrorCode::RESERVED_ALIAS => ErrorKind::ReservedAlias,
        ErrorCode::INVALID_ARGUMENT => ErrorKind::InvalidArgument,
        ErrorCode::OUT_OF_BOUNDS => ErrorKind::OutOfBounds,
        ErrorCode::ALIAS_TOO_LONG => ErrorKind::AliasTooLong,
        ErrorCode::ENTRY_TOO_LARGE => ErrorKind::EntryTooLarge,
        ErrorCode::BUFFER_TOO_SMALL => ErrorKind::BufferTooSmall,
        _ => ErrorKind::Input,
    }
}

fn classify_operation(code: ErrorCode) -> ErrorKind {
    match code {
        ErrorCode::ALIAS_NOT_FOUND => ErrorKind::AliasNotFound,
        ErrorCode::ALIAS_ALREADY_EXISTS => ErrorKind::AliasAlreadyExists,
        ErrorCode::INCOMPATIBLE_TYPE => ErrorKind::IncompatibleType,
        ErrorCode::OPERATION_DISABLED => ErrorKind::OperationDisabled,
        ErrorCode::OPERATION_NOT_PERMITTED => ErrorKind::OperationNotPermitted,
        ErrorCode::OVERFLOW => ErrorKind::Overflow,
        ErrorCode::UNDERFLOW => ErrorKind::Underflow,
        ErrorCode::RESOURCE_LOCKED => ErrorKind::ResourceLocked,
        ErrorCode::CONFLICT => ErrorKind::Conflict,
        _ => ErrorKind::Operation,
    }
}

fn classify_connection(code: ErrorCode) -> ErrorKind {
    match code {
        ErrorCode::CONNECTION_REFUSED => ErrorKind::ConnectionRefused,
        ErrorCode::CONNECTION_RESET => ErrorKind::ConnectionReset,
        ErrorCode::HOST_NOT_FOUND => ErrorKind::HostNotFound,
        ErrorCode::TIMEOUT => ErrorKind::Timeout,
        ErrorCode::NOT_CONNECTED => ErrorKind::NotConnected,
        _ => ErrorKind::Connection,
    }
}

fn classify_protocol(code: ErrorCode) -> ErrorKind {
    match code {
        ErrorCode::UNEXPECTED_REPLY => ErrorKind::UnexpectedReply,
        ErrorCode::INVALID_PROTOCOL => ErrorKind::InvalidProtocol,
        ErrorCode::INVALID_VERSION => ErrorKind::InvalidVersion,
        _ => ErrorKind::Protocol,
    }
}

fn classify_system(code: ErrorCode, generic: ErrorKind) -> ErrorKind {
    match code {
        ErrorCode::NO_MEMORY_LOCAL | ErrorCode::NO_MEMORY_REMOTE => ErrorKind::OutOfMemory,
        ErrorCode::NOT_IMPLEMENTED => ErrorKind::NotImplemented,
        _ => generic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_severity_is_success() {
        assert!(classify(ErrorCode::OK, "").is_ok());
        assert!(classify(ErrorCode::OK_CREATED, "").is_ok());
        assert!(classify(ErrorCode::UNMATCHED_CONTENT, "").is_ok());
        assert!(classify(ErrorCode::ELEMENT_NOT_FOUND, "").is_ok());
    }

    #[test]
    fn known_codes_map_to_specific_kinds() {
        let cases = [
            (ErrorCode::RESERVED_ALIAS, ErrorKind::ReservedAlias, Origin::Input),
            (ErrorCode::INVALID_ARGUMENT, ErrorKind::InvalidArgument, Origin::Input),
            (ErrorCode::OUT_OF_BOUNDS, ErrorKind::OutOfBounds, Origin::Input),
            (ErrorCode::ALIAS_NOT_FOUND, ErrorKind::AliasNotFound, Origin::Operation),
            (ErrorCode::ALIAS_ALREADY_EXISTS, ErrorKind::AliasAlreadyExists, Origin::Operation),
            (ErrorCode::INCOMPATIBLE_TYPE, ErrorKind::IncompatibleType, Origin::Operation),
            (ErrorCode::OPERATION_DISABLED, ErrorKind::OperationDisabled, Origin::Operation),
            (ErrorCode::OVERFLOW, ErrorKind::Overflow, Origin::Operation),
            (ErrorCode::UNDERFLOW, ErrorKind::Underflow, Origin::Operation),
            (ErrorCode::RESOURCE_LOCKED, ErrorKind::ResourceLocked, Origin::Operation),
            (ErrorCode::CONNECTION_REFUSED, ErrorKind::ConnectionRefused, Origin::Connection),
            (ErrorCode::HOST_NOT_FOUND, ErrorKind::HostNotFound, Origin::Connection),
            (ErrorCode::UNEXPECTED_REPLY, ErrorKind::UnexpectedReply, Origin::Protocol),
            (ErrorCode::NO_MEMORY_REMOTE, ErrorKind::OutOfMemory, Origin::RemoteSystem),
        ];

        for (code, kind, origin) in cases {
            let err = classify(code, "").unwrap_err();
            assert_eq!(err.kind, kind, "code {}", code);
            assert_eq!(err.origin, origin, "code {}", code);
            assert_eq!(err.code, code);
        }
    }

    #[test]
    fn unmapped_code_falls_back_to_family_with_message() {
        let code = ErrorCode::new(Origin::Operation, Severity::Error, 0x7FFF);
        let err = classify(code, "something odd happened").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Operation);
        assert_eq!(err.message, "something odd happened");

        let code = ErrorCode::new(Origin::Input, Severity::Warning, 0x1234);
        assert_eq!(classify(code, "x").unwrap_err().kind, ErrorKind::Input);

        let code = ErrorCode::new(Origin::LocalSystem, Severity::Error, 0x0042);
        assert_eq!(classify(code, "x").unwrap_err().kind, ErrorKind::LocalSystem);
    }

    #[test]
    fn unknown_origin_is_generic() {
        let err = classify(ErrorCode(0x1200_0042), "").unwrap_err();
        assert_eq!(err.origin, Origin::Unknown);
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert_eq!(err.message, "unknown error");
    }

    #[test]
    fn classification_is_total() {
        // every origin nibble, every severity nibble, a spread of low codes
        for origin in 0u32..16 {
            for severity in 0u32..16 {
                for low in [0u32, 1, 0x1D, 0x22, 0xFFFF] {
                    let code = ErrorCode((origin << 28) | (severity << 24) | low);
                    let outcome = classify(code, "");
                    assert_eq!(outcome.is_ok(), severity == 0, "code {}", code);
                }
            }
        }
    }

    #[test]
    fn empty_message_uses_description() {
        let err = classify(ErrorCode::ALIAS_NOT_FOUND, "").unwrap_err();
        assert_eq!(err.message, "alias not found");
    }

    #[test]
    fn fields_decode() {
        let code = ErrorCode::RESERVED_ALIAS;
        assert_eq!(code.origin(), Origin::Input);
        assert_eq!(code.severity(), Severity::Error);
        assert_eq!(code.code(), 0x001D);
        assert_eq!(ErrorCode::new(Origin::Input, Severity::Error, 0x001D), code);
    }
}
