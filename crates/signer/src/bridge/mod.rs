mod client;
mod protocol;

pub use client::{BridgeClient, DEFAULT_BRIDGE_URL};
pub use protocol::{
    BridgeEvent, BridgeException, BridgeRequest, ExecExceptionData, ExecSuccessData, HandleData,
    ReaderData, classify_exception, decode_frame, encode_frame,
};
