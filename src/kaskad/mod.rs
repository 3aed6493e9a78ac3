//! The kaskad module contains the components responsible for the framed UART
//! protocol: the wire codec, the command catalog, the link abstraction and
//! the transport session that runs request/response exchanges.

pub mod command;
pub mod frame;
pub mod link;
pub mod link_mock;
pub mod session;

pub use command::{Command, ResponseShape};
pub use frame::{
    checksum, crc8, encode_request, parse_frame, stuff, unstuff, Direction, Packet, PacketHeader,
};
pub use link::{MeterLink, SerialConfig, SerialLink};
pub use session::{MeterSession, SessionConfig};
