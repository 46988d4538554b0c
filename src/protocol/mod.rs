//! Length-framed binary wire protocol (§4.9). The donor has no network layer
//! of its own (it's an embedded library); this module's framing style is
//! grounded on the WAL's own fixed/variable header split in `wal::entry`,
//! narrowed to the protocol's 16-byte fixed header and built out fresh for
//! the spec's message-type set.

pub mod codec;
pub mod header;
pub mod message;

pub use codec::{validate_handshake_sequence, Message, CHECKSUM_SIZE};
pub use header::{Header, MessageType, HEADER_SIZE, PROTOCOL_MAGIC, PROTOCOL_VERSION};
pub use message::{
    AuthenticationPayload, BulkOpItem, BulkOpKind, BulkOpResult, BulkOperationPayload,
    BulkOperationResponse, ErrorPayload, HandshakePayload, ResponsePayload,
};
