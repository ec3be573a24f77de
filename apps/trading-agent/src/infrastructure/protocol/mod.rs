//! Brokerage Event Stream Protocol
//!
//! Decoding of the `0x01`/`0x02` delimited wire format and classification of each
//! message by its `p_cmd` field.

mod codec;
mod command;

pub use codec::{
    Fields, KEY_VALUE_SEPARATOR, ProtocolError, RECORD_SEPARATOR, encode_pairs, parse, serialize,
};
pub use command::{COMMAND_FIELD, Command};
