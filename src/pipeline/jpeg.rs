use crate::tools::Tool;

/// `jpegtran` re-encodes with optimal Huffman tables and drops metadata;
/// `jfifremove` then strips the JFIF APP0 segment. There is no
/// `jfifremove` build for Windows.
pub const JPEG_CHAIN: &[Tool] = if cfg!(windows) {
    &[Tool::Jpegtran]
} else {
    &[Tool::Jpegtran, Tool::Jfifremove]
};
