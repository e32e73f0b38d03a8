//! Memory-mapped view of a matrix file
//!
//! Maps a file read-only and locates its header, metadata block and buffer
//! regions without creating a matrix. Useful for tooling that wants to look
//! at large files; loading still goes through [`crate::read`].

use std::fs::File;
use std::ops::{Deref, Range};
use std::path::{Path, PathBuf};

use grbfile_core::format::constants::HEADER_LEN;
use grbfile_core::validation::{header_field, parse_version};
use grbfile_core::{
    buffer_plan, BinaryMetadata, BufferPlan, ElementType, FormatError, Layout, TypeTable,
};
use memmap2::{Mmap, MmapOptions};

use crate::error::Result;

/// One buffer region of the file
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Region {
    /// `Ap`, `Ah`, `Ai`, `Ab` or `Ax`
    pub name: &'static str,
    pub offset: usize,
    pub len: usize,
}

impl Region {
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Printable description of a file, as reported by `grbfile info`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FileSummary {
    pub path: PathBuf,
    pub version: Option<(u32, u32, u32)>,
    pub user_agent: Option<String>,
    pub implementation: u64,
    pub layout: &'static str,
    pub element_type: Option<&'static str>,
    pub typesize: usize,
    pub iso: bool,
    pub nrows: u64,
    pub ncols: u64,
    pub nvec: u64,
    pub nvals: u64,
    pub sparsity_control: i32,
    pub hyper_switch: f64,
    pub bitmap_switch: f64,
    pub comment: Option<String>,
    pub file_len: usize,
    pub trailing_bytes: usize,
    pub regions: Vec<Region>,
}

enum Backing {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Deref for Backing {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Backing::Mapped(mmap) => mmap,
            Backing::Owned(bytes) => bytes,
        }
    }
}

/// Read-only mapping of a matrix file
pub struct BinFileView {
    path: PathBuf,
    bytes: Backing,
    metadata: BinaryMetadata,
    layout: Layout,
    plan: BufferPlan,
    regions: Vec<Region>,
}

impl BinFileView {
    /// Map the file at `path` and locate its regions
    ///
    /// The implementation id is not compared with any engine; the view
    /// accepts files written by any version.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        if (file.metadata()?.len() as usize) < HEADER_LEN + BinaryMetadata::SIZE {
            return Err(FormatError::Truncated.into());
        }

        // SAFETY: Read-only mapping; every slice handed out is bounds-checked
        // against the mapped length below
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        Self::locate(path, Backing::Mapped(mmap))
    }

    /// View a file already held in memory, such as a decompressed stream
    pub fn from_bytes<P: AsRef<Path>>(path: P, bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < HEADER_LEN + BinaryMetadata::SIZE {
            return Err(FormatError::Truncated.into());
        }
        Self::locate(path.as_ref().to_path_buf(), Backing::Owned(bytes))
    }

    fn locate(path: PathBuf, bytes: Backing) -> Result<Self> {
        let metadata = BinaryMetadata::from_bytes(&bytes[HEADER_LEN..])?;
        let layout = metadata.layout()?;
        let plan = buffer_plan(
            layout,
            metadata.nrows,
            metadata.ncols,
            metadata.nvec,
            metadata.nvals,
            metadata.typesize,
            metadata.iso,
        )?;

        let mut offset = HEADER_LEN + BinaryMetadata::SIZE;
        let mut regions = Vec::with_capacity(5);
        let sized = [
            ("Ap", plan.ap),
            ("Ah", plan.ah),
            ("Ai", plan.ai),
            ("Ab", plan.ab),
            ("Ax", Some(plan.ax)),
        ];
        for (name, len) in sized {
            let Some(len) = len else { continue };
            regions.push(Region { name, offset, len });
            offset = offset.checked_add(len).ok_or(FormatError::SizeOverflow)?;
        }
        if offset > bytes.len() {
            return Err(FormatError::Truncated.into());
        }

        tracing::debug!(
            path = %path.display(),
            %layout,
            bytes = bytes.len(),
            "located file regions"
        );
        Ok(Self {
            path,
            bytes,
            metadata,
            layout,
            plan,
            regions,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> &BinaryMetadata {
        &self.metadata
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn plan(&self) -> &BufferPlan {
        &self.plan
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Size of the file
    pub fn file_len(&self) -> usize {
        self.bytes.len()
    }

    /// Bytes past the last region, which readers ignore
    pub fn trailing_bytes(&self) -> usize {
        let end = HEADER_LEN + BinaryMetadata::SIZE + self.plan.total();
        self.bytes.len() - end
    }

    /// The raw 512-byte ASCII header
    pub fn header_bytes(&self) -> &[u8] {
        &self.bytes[..HEADER_LEN]
    }

    /// Header text without its space padding
    pub fn header_text(&self) -> String {
        String::from_utf8_lossy(self.header_bytes())
            .trim_end_matches(' ')
            .to_string()
    }

    /// Value of a `key: value` header line
    pub fn header_field(&self, key: &str) -> Option<&str> {
        header_field(self.header_bytes(), key)
    }

    /// Version and producer from the header's second line
    pub fn version(&self) -> Option<((u32, u32, u32), &str)> {
        let text = core::str::from_utf8(self.header_bytes()).ok()?;
        let line = text.lines().nth(1)?;
        let version = parse_version(line).ok()?;
        let agent = line
            .split_once(' ')
            .map(|(_, rest)| rest.trim().trim_start_matches('(').trim_end_matches(')'))
            .unwrap_or("");
        Some((version, agent))
    }

    /// Last header line, `None` when the writer gave no comment
    pub fn comment(&self) -> Option<&str> {
        let text = core::str::from_utf8(self.header_bytes()).ok()?;
        let line = text.lines().nth(10)?.trim_end();
        (line != "None").then_some(line)
    }

    /// Decode the element type, honouring complex support as `types` allows
    pub fn element_type(&self, types: &TypeTable) -> Result<ElementType> {
        Ok(types.decode(self.metadata.typecode)?)
    }

    /// Bytes of the named region
    pub fn region(&self, name: &str) -> Option<&[u8]> {
        let region = self.regions.iter().find(|region| region.name == name)?;
        self.bytes.get(region.range())
    }

    /// Copy an index region out of the mapping
    ///
    /// Index regions sit at arbitrary byte offsets, so they are copied
    /// rather than reinterpreted in place.
    pub fn indices(&self, name: &str) -> Option<Vec<u64>> {
        self.region(name).map(bytemuck::pod_collect_to_vec::<u8, u64>)
    }

    pub fn summary(&self) -> FileSummary {
        let metadata = &self.metadata;
        let version = self.version();
        FileSummary {
            path: self.path.clone(),
            version: version.map(|(version, _)| version),
            user_agent: version.map(|(_, agent)| agent.to_string()),
            implementation: metadata.implementation,
            layout: self.layout.tag(),
            element_type: ElementType::from_code(metadata.typecode).map(ElementType::name),
            typesize: metadata.typesize,
            iso: metadata.iso,
            nrows: metadata.nrows,
            ncols: metadata.ncols,
            nvec: metadata.nvec,
            nvals: metadata.nvals,
            sparsity_control: metadata.sparsity_control,
            hyper_switch: metadata.hyper_switch,
            bitmap_switch: metadata.bitmap_switch,
            comment: self.comment().map(str::to_string),
            file_len: self.file_len(),
            trailing_bytes: self.trailing_bytes(),
            regions: self.regions.clone(),
        }
    }
}
