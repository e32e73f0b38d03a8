//! ASCII header block
//!
//! The first 512 bytes of a matrix file are a human readable summary. The
//! reader skips them entirely; they exist for `head -c 512` style
//! diagnostics.

use alloc::string::String;
use core::fmt::Write;

use super::constants::{HEADER_LEN, HEADER_TITLE};
use super::layout::Layout;
use super::types::ElementType;

/// Fields rendered into the ASCII header
#[derive(Debug, Clone, PartialEq)]
pub struct AsciiHeader<'a> {
    /// Engine version triple
    pub version: (u32, u32, u32),
    /// Producer identifier
    pub user_agent: &'a str,
    pub nrows: u64,
    pub ncols: u64,
    pub nvec: u64,
    pub nvals: u64,
    pub layout: Layout,
    /// Element size in bytes
    pub size: usize,
    pub element_type: ElementType,
    pub iso: bool,
    /// Free-form trailing text
    pub comments: Option<&'a str>,
}

impl AsciiHeader<'_> {
    /// Render the template without padding
    pub fn text(&self) -> String {
        let (major, minor, sub) = self.version;
        let mut text = String::with_capacity(HEADER_LEN);
        // Writing into a String cannot fail
        let _ = write!(
            text,
            "{HEADER_TITLE}\n\
             v{major}.{minor}.{sub} ({agent})\n\
             nrows:   {nrows}\n\
             ncols:   {ncols}\n\
             nvec:    {nvec}\n\
             nvals:   {nvals}\n\
             format:  {format}\n\
             size:    {size}\n\
             type:    {ty}\n\
             iso:     {iso}\n\
             {comments}\n",
            agent = self.user_agent,
            nrows = self.nrows,
            ncols = self.ncols,
            nvec = self.nvec,
            nvals = self.nvals,
            format = self.layout.tag(),
            size = self.size,
            ty = self.element_type.name(),
            iso = self.iso as u8,
            comments = self.comments.unwrap_or("None"),
        );
        text
    }

    /// Render the fixed-size block
    ///
    /// Left-justified and padded with spaces; text beyond 512 bytes is cut
    /// off and non-ASCII bytes are replaced with `?`.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut block = [b' '; HEADER_LEN];
        for (slot, byte) in block.iter_mut().zip(self.text().bytes()) {
            *slot = if byte.is_ascii() { byte } else { b'?' };
        }
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    fn header(comments: Option<&str>) -> AsciiHeader<'_> {
        AsciiHeader {
            version: (9, 3, 1),
            user_agent: "grbfile-0.1.0",
            nrows: 2,
            ncols: 2,
            nvec: 2,
            nvals: 2,
            layout: Layout::Csr,
            size: 1,
            element_type: ElementType::Bool,
            iso: false,
            comments,
        }
    }

    #[test]
    fn test_template() {
        let text = header(Some("hello")).text();
        let expected = "SuiteSparse:GraphBLAS matrix\n\
                        v9.3.1 (grbfile-0.1.0)\n\
                        nrows:   2\n\
                        ncols:   2\n\
                        nvec:    2\n\
                        nvals:   2\n\
                        format:  CSR\n\
                        size:    1\n\
                        type:    GrB_BOOL\n\
                        iso:     0\n\
                        hello\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_block_is_padded_with_spaces() {
        let block = header(None).to_bytes();
        let text = header(None).text();
        assert_eq!(block.len(), HEADER_LEN);
        assert_eq!(&block[..text.len()], text.as_bytes());
        assert!(block[text.len()..].iter().all(|&b| b == b' '));
        assert!(text.ends_with("None\n"));
    }

    #[test]
    fn test_long_comment_is_truncated() {
        let long = "x".repeat(2000);
        let block = header(Some(&long)).to_bytes();
        assert_eq!(block.len(), HEADER_LEN);
        assert_eq!(block[HEADER_LEN - 1], b'x');
    }

    #[test]
    fn test_non_ascii_is_replaced() {
        let comment = "caf\u{e9}".to_string();
        let block = header(Some(&comment)).to_bytes();
        assert!(block.is_ascii());
    }
}
