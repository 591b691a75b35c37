//! GIF89a encoding: LZW compression and stream serialization.

mod lzw;
mod writer;

pub use lzw::compress;
pub use writer::{EncodedFrame, GifWriter};
