//! Binary frame decoding
//!
//! Binary frames are materialized asynchronously before they reach the
//! renderer. The bridge awaits each decode before taking the next frame, so
//! decoding latency never reorders output.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unreadable binary frame: {0}")]
    Unreadable(String),
}

/// Turns a binary frame payload into bytes for the renderer
#[async_trait]
pub trait FrameDecoder: Send + Sync {
    async fn decode(&self, payload: Vec<u8>) -> Result<Vec<u8>, DecodeError>;
}

/// Decoder for backends that send terminal output as raw bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct RawDecoder;

#[async_trait]
impl FrameDecoder for RawDecoder {
    async fn decode(&self, payload: Vec<u8>) -> Result<Vec<u8>, DecodeError> {
        Ok(payload)
    }
}
