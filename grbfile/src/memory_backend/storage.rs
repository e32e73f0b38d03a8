//! Layout storage of an in-memory matrix
//!
//! A matrix is stored in exactly one of the four sparsity classes. Every
//! conversion goes through [`Tuples`], a flat list of `(major, minor, value)`
//! entries sorted in vector order, so each class only needs a decoder to
//! tuples and a builder from tuples.

use grbfile_core::format::constants::INDEX_SIZE;
use grbfile_core::{
    buffer_plan, check_pointers, BitmapParts, FullParts, HyperParts, Layout, Orientation,
    SparseParts, Sparsity, SparsityControl, Status,
};
use rayon::prelude::*;

/// Dimensions and element width of a matrix in its current orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Shape {
    pub orientation: Orientation,
    pub nrows: u64,
    pub ncols: u64,
    pub size: usize,
}

impl Shape {
    /// Number of vectors
    pub fn vdim(&self) -> u64 {
        self.orientation.vdim(self.nrows, self.ncols)
    }

    /// Length of each vector
    pub fn vlen(&self) -> u64 {
        self.orientation.vlen(self.nrows, self.ncols)
    }

    /// Same matrix seen in the other orientation
    pub fn transposed(&self) -> Self {
        let orientation = match self.orientation {
            Orientation::ByRow => Orientation::ByCol,
            Orientation::ByCol => Orientation::ByRow,
        };
        Self {
            orientation,
            ..*self
        }
    }

    /// Number of dense positions, if it is addressable
    pub fn positions(&self) -> Result<usize, Rejected> {
        self.vdim()
            .checked_mul(self.vlen())
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| Rejected::new(Status::OutOfMemory, "dense size overflows"))
    }

    fn vector_count(&self) -> Result<usize, Rejected> {
        usize::try_from(self.vdim())
            .map_err(|_| Rejected::new(Status::OutOfMemory, "vector count overflows"))
    }
}

/// A failed engine operation with its diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Rejected {
    pub status: Status,
    pub message: String,
}

impl Rejected {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Stored structure of a matrix
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Storage {
    Hyper(HyperParts),
    Sparse(SparseParts),
    Bitmap(BitmapParts),
    Full(FullParts),
}

impl Storage {
    /// Empty hypersparse structure, the state of a new or unpacked matrix
    pub fn empty() -> Self {
        Storage::Hyper(HyperParts {
            ap: vec![0],
            ..HyperParts::default()
        })
    }

    pub fn sparsity(&self) -> Sparsity {
        match self {
            Storage::Hyper(_) => Sparsity::Hypersparse,
            Storage::Sparse(_) => Sparsity::Sparse,
            Storage::Bitmap(_) => Sparsity::Bitmap,
            Storage::Full(_) => Sparsity::Full,
        }
    }

    pub fn nvals(&self, shape: &Shape) -> u64 {
        match self {
            Storage::Hyper(parts) => parts.ai.len() as u64,
            Storage::Sparse(parts) => parts.ai.len() as u64,
            Storage::Bitmap(parts) => parts.nvals,
            Storage::Full(_) => shape.vdim().saturating_mul(shape.vlen()),
        }
    }

    pub fn iso(&self) -> bool {
        match self {
            Storage::Hyper(parts) => parts.iso,
            Storage::Sparse(parts) => parts.iso,
            Storage::Bitmap(parts) => parts.iso,
            Storage::Full(parts) => parts.iso,
        }
    }

    pub fn jumbled(&self) -> bool {
        match self {
            Storage::Hyper(parts) => parts.jumbled,
            Storage::Sparse(parts) => parts.jumbled,
            Storage::Bitmap(_) | Storage::Full(_) => false,
        }
    }

    /// Value bytes of the entry at `(major, minor)`, if present
    pub fn lookup(&self, shape: &Shape, major: u64, minor: u64) -> Option<&[u8]> {
        let size = shape.size;
        let slot = match self {
            Storage::Hyper(parts) => {
                let k = parts.ah.binary_search(&major).ok()?;
                find_in_vector(&parts.ap, &parts.ai, k, minor, parts.jumbled)?
            }
            Storage::Sparse(parts) => {
                let k = usize::try_from(major).ok()?;
                find_in_vector(&parts.ap, &parts.ai, k, minor, parts.jumbled)?
            }
            Storage::Bitmap(parts) => {
                let pos = usize::try_from(major * shape.vlen() + minor).ok()?;
                if parts.ab[pos] == 0 {
                    return None;
                }
                pos
            }
            Storage::Full(_) => usize::try_from(major * shape.vlen() + minor).ok()?,
        };
        let (ax, iso) = match self {
            Storage::Hyper(parts) => (&parts.ax, parts.iso),
            Storage::Sparse(parts) => (&parts.ax, parts.iso),
            Storage::Bitmap(parts) => (&parts.ax, parts.iso),
            Storage::Full(parts) => (&parts.ax, parts.iso),
        };
        Some(value_at(ax, iso, slot, size))
    }

    /// Decode into tuples, in vector order unless the storage is jumbled
    pub fn to_tuples(&self, shape: &Shape) -> Tuples {
        let size = shape.size;
        let mut tuples = Tuples::default();
        match self {
            Storage::Hyper(parts) => {
                for (k, &major) in parts.ah.iter().enumerate() {
                    let (start, end) = (parts.ap[k] as usize, parts.ap[k + 1] as usize);
                    for p in start..end {
                        tuples.push(major, parts.ai[p], value_at(&parts.ax, parts.iso, p, size));
                    }
                }
            }
            Storage::Sparse(parts) => {
                for k in 0..parts.ap.len().saturating_sub(1) {
                    let (start, end) = (parts.ap[k] as usize, parts.ap[k + 1] as usize);
                    for p in start..end {
                        tuples.push(k as u64, parts.ai[p], value_at(&parts.ax, parts.iso, p, size));
                    }
                }
            }
            Storage::Bitmap(parts) => {
                let vlen = shape.vlen().max(1);
                for (pos, _) in parts.ab.iter().enumerate().filter(|(_, &b)| b != 0) {
                    let pos64 = pos as u64;
                    let value = value_at(&parts.ax, parts.iso, pos, size);
                    tuples.push(pos64 / vlen, pos64 % vlen, value);
                }
            }
            Storage::Full(parts) => {
                let (vdim, vlen) = (shape.vdim(), shape.vlen());
                let mut pos = 0;
                for major in 0..vdim {
                    for minor in 0..vlen {
                        tuples.push(major, minor, value_at(&parts.ax, parts.iso, pos, size));
                        pos += 1;
                    }
                }
            }
        }
        tuples
    }

    /// Sort the indices of each vector in place
    pub fn unjumble(&mut self, size: usize) {
        let (ap, ai, ax, iso, jumbled) = match self {
            Storage::Hyper(parts) => (
                &parts.ap,
                &mut parts.ai,
                &mut parts.ax,
                parts.iso,
                &mut parts.jumbled,
            ),
            Storage::Sparse(parts) => (
                &parts.ap,
                &mut parts.ai,
                &mut parts.ax,
                parts.iso,
                &mut parts.jumbled,
            ),
            Storage::Bitmap(_) | Storage::Full(_) => return,
        };
        if !*jumbled {
            return;
        }
        for window in ap.windows(2) {
            let (start, end) = (window[0] as usize, window[1] as usize);
            let mut order: Vec<usize> = (start..end).collect();
            order.sort_by_key(|&p| ai[p]);
            let sorted_ai: Vec<u64> = order.iter().map(|&p| ai[p]).collect();
            ai[start..end].copy_from_slice(&sorted_ai);
            if !iso && size > 0 {
                let sorted_ax: Vec<u8> = order
                    .iter()
                    .flat_map(|&p| ax[p * size..(p + 1) * size].iter().copied())
                    .collect();
                ax[start * size..end * size].copy_from_slice(&sorted_ax);
            }
        }
        *jumbled = false;
    }

    /// Check a structure handed in by a caller against the matrix shape
    pub fn validate(&self, shape: &Shape) -> Result<(), Rejected> {
        let invalid = |what: String| Rejected::new(Status::InvalidValue, what);
        let layout = Layout::new(shape.orientation, self.sparsity());

        let (nvec, nvals) = match self {
            Storage::Hyper(parts) => {
                if parts.ah.len() as u64 != parts.nvec {
                    return Err(invalid(format!(
                        "Ah has {} entries, expected nvec = {}",
                        parts.ah.len(),
                        parts.nvec
                    )));
                }
                if parts.ah.windows(2).any(|pair| pair[0] >= pair[1]) {
                    return Err(Rejected::new(
                        Status::InvalidObject,
                        "Ah is not strictly increasing",
                    ));
                }
                if parts.ah.last().is_some_and(|&last| last >= shape.vdim()) {
                    return Err(Rejected::new(Status::IndexOutOfBounds, "Ah entry out of range"));
                }
                (parts.nvec, parts.ai.len() as u64)
            }
            Storage::Sparse(parts) => (shape.vdim(), parts.ai.len() as u64),
            Storage::Bitmap(parts) => {
                if parts.ab.iter().any(|&b| b != 0 && b != 1) {
                    return Err(invalid("Ab entries must be 0 or 1".into()));
                }
                let present = parts.ab.iter().filter(|&&b| b != 0).count() as u64;
                if present != parts.nvals {
                    return Err(invalid(format!(
                        "Ab marks {present} entries but nvals is {}",
                        parts.nvals
                    )));
                }
                (shape.vdim(), parts.nvals)
            }
            Storage::Full(_) => (shape.vdim(), 0),
        };

        let plan = buffer_plan(
            layout,
            shape.nrows,
            shape.ncols,
            nvec,
            nvals,
            shape.size,
            self.iso(),
        )
        .map_err(|err| Rejected::new(Status::OutOfMemory, err.to_string()))?;

        let (ax_len, ab_len) = match self {
            Storage::Hyper(parts) => (parts.ax.len(), None),
            Storage::Sparse(parts) => (parts.ax.len(), None),
            Storage::Bitmap(parts) => (parts.ax.len(), Some(parts.ab.len())),
            Storage::Full(parts) => (parts.ax.len(), None),
        };
        if ax_len != plan.ax {
            return Err(invalid(format!("Ax holds {ax_len} bytes, expected {}", plan.ax)));
        }
        if ab_len != plan.ab {
            return Err(invalid(format!("Ab holds {ab_len:?} bytes, expected {:?}", plan.ab)));
        }

        let (ap, ai, jumbled) = match self {
            Storage::Hyper(parts) => (&parts.ap, &parts.ai, parts.jumbled),
            Storage::Sparse(parts) => (&parts.ap, &parts.ai, parts.jumbled),
            Storage::Bitmap(_) | Storage::Full(_) => return Ok(()),
        };
        if plan.ap != Some(ap.len() * INDEX_SIZE) {
            return Err(invalid(format!("Ap has {} entries, expected {}", ap.len(), nvec + 1)));
        }
        check_pointers(ap, nvec, nvals)
            .map_err(|err| Rejected::new(Status::InvalidObject, err.to_string()))?;
        if ai.iter().any(|&i| i >= shape.vlen()) {
            return Err(Rejected::new(Status::IndexOutOfBounds, "Ai entry out of range"));
        }
        if !jumbled {
            let unsorted = ap.windows(2).any(|w| {
                ai[w[0] as usize..w[1] as usize]
                    .windows(2)
                    .any(|pair| pair[0] >= pair[1])
            });
            if unsorted {
                return Err(Rejected::new(
                    Status::InvalidObject,
                    "Ai is unsorted but the matrix is not marked jumbled",
                ));
            }
        }
        Ok(())
    }
}

fn find_in_vector(ap: &[u64], ai: &[u64], k: usize, minor: u64, jumbled: bool) -> Option<usize> {
    let (start, end) = (*ap.get(k)? as usize, *ap.get(k + 1)? as usize);
    let vector = &ai[start..end];
    let offset = if jumbled {
        vector.iter().position(|&i| i == minor)?
    } else {
        vector.binary_search(&minor).ok()?
    };
    Some(start + offset)
}

fn value_at(ax: &[u8], iso: bool, slot: usize, size: usize) -> &[u8] {
    if iso {
        &ax[..size]
    } else {
        &ax[slot * size..(slot + 1) * size]
    }
}

/// Flat entry list in vector order
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Tuples {
    pub major: Vec<u64>,
    pub minor: Vec<u64>,
    /// One value per entry, never iso-compressed
    pub values: Vec<u8>,
}

impl Tuples {
    pub fn len(&self) -> usize {
        self.major.len()
    }

    pub fn push(&mut self, major: u64, minor: u64, value: &[u8]) {
        self.major.push(major);
        self.minor.push(minor);
        self.values.extend_from_slice(value);
    }

    pub fn value(&self, k: usize, size: usize) -> &[u8] {
        &self.values[k * size..(k + 1) * size]
    }

    /// Sort into vector order; for repeated positions the last pushed entry wins
    pub fn sorted(self, size: usize) -> Self {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.par_sort_by_key(|&k| (self.major[k], self.minor[k]));

        let mut out = Tuples::default();
        for (n, &k) in order.iter().enumerate() {
            let next_same = order.get(n + 1).is_some_and(|&next| {
                self.major[next] == self.major[k] && self.minor[next] == self.minor[k]
            });
            if !next_same {
                out.push(self.major[k], self.minor[k], self.value(k, size));
            }
        }
        out
    }

    /// Swap the roles of major and minor and restore vector order
    pub fn transposed(self, size: usize) -> Self {
        Tuples {
            major: self.minor,
            minor: self.major,
            values: self.values,
        }
        .sorted(size)
    }

    fn nvec_nonempty(&self) -> usize {
        1 + self.major.windows(2).filter(|pair| pair[0] != pair[1]).count()
            - usize::from(self.major.is_empty())
    }
}

/// Pick the sparsity class for the given entries
///
/// Full wins whenever every position is present and full is allowed. Bitmap
/// is chosen when the density reaches the bitmap switch or no compressed
/// class is allowed. Among compressed classes hypersparse is chosen when the
/// share of non-empty vectors is at most the hyper switch.
pub(crate) fn choose_sparsity(
    control: SparsityControl,
    hyper_switch: f64,
    bitmap_switch: f64,
    tuples: &Tuples,
    shape: &Shape,
) -> Sparsity {
    let total = shape.vdim() as u128 * shape.vlen() as u128;
    let nvals = tuples.len() as u128;
    let compressed_allowed =
        control.allows(Sparsity::Hypersparse) || control.allows(Sparsity::Sparse);

    if nvals == total && control.allows(Sparsity::Full) {
        return Sparsity::Full;
    }
    let dense_enough = total > 0 && nvals as f64 / total as f64 >= bitmap_switch;
    if control.allows(Sparsity::Bitmap) && (dense_enough || !compressed_allowed) {
        return Sparsity::Bitmap;
    }
    let sparse_vectors = tuples.nvec_nonempty() as f64 <= hyper_switch * shape.vdim() as f64;
    let only_hyper = !control.allows(Sparsity::Sparse);
    if control.allows(Sparsity::Hypersparse) && (sparse_vectors || only_hyper) {
        return Sparsity::Hypersparse;
    }
    if control.allows(Sparsity::Sparse) {
        return Sparsity::Sparse;
    }
    Sparsity::Bitmap
}

/// Collapse a value array to a single element when every entry is identical
fn compact(values: Vec<u8>, count: usize, size: usize) -> (Vec<u8>, bool) {
    if count == 0 || size == 0 {
        return (values, false);
    }
    let first = &values[..size];
    if values.chunks_exact(size).all(|chunk| chunk == first) {
        (first.to_vec(), true)
    } else {
        (values, false)
    }
}

/// Build a structure of the given class from sorted tuples
pub(crate) fn build(tuples: Tuples, class: Sparsity, shape: &Shape) -> Result<Storage, Rejected> {
    let size = shape.size;
    let count = tuples.len();
    match class {
        Sparsity::Sparse => {
            let vdim = shape.vector_count()?;
            let mut ap = vec![0u64; vdim + 1];
            for &major in &tuples.major {
                ap[major as usize + 1] += 1;
            }
            for k in 0..vdim {
                ap[k + 1] += ap[k];
            }
            let (ax, iso) = compact(tuples.values, count, size);
            Ok(Storage::Sparse(SparseParts {
                ap,
                ai: tuples.minor,
                ax,
                iso,
                jumbled: false,
            }))
        }
        Sparsity::Hypersparse => {
            let mut ap = vec![0u64];
            let mut ah = Vec::new();
            for (k, &major) in tuples.major.iter().enumerate() {
                if ah.last() != Some(&major) {
                    if !ah.is_empty() {
                        ap.push(k as u64);
                    }
                    ah.push(major);
                }
            }
            if !ah.is_empty() {
                ap.push(count as u64);
            }
            let (ax, iso) = compact(tuples.values, count, size);
            Ok(Storage::Hyper(HyperParts {
                nvec: ah.len() as u64,
                ap,
                ah,
                ai: tuples.minor,
                ax,
                iso,
                jumbled: false,
            }))
        }
        Sparsity::Bitmap => {
            let positions = shape.positions()?;
            let vlen = shape.vlen();
            let mut ab = vec![0i8; positions];
            let mut ax = vec![0u8; positions * size];
            for k in 0..count {
                let pos = (tuples.major[k] * vlen + tuples.minor[k]) as usize;
                ab[pos] = 1;
                ax[pos * size..(pos + 1) * size].copy_from_slice(tuples.value(k, size));
            }
            let (first, iso) = compact(tuples.values, count, size);
            if iso {
                ax = first;
            }
            Ok(Storage::Bitmap(BitmapParts {
                ab,
                ax,
                iso,
                nvals: count as u64,
            }))
        }
        Sparsity::Full => {
            let positions = shape.positions()?;
            if count != positions {
                return Err(Rejected::new(
                    Status::InvalidValue,
                    format!("full storage needs {positions} entries, matrix has {count}"),
                ));
            }
            let (ax, iso) = compact(tuples.values, count, size);
            Ok(Storage::Full(FullParts { ax, iso }))
        }
    }
}
