#![forbid(unsafe_code)]
//! QR Code Model 2 symbol encoding.
//!
//! This module turns a text payload into a square matrix of dark and light modules. It picks the
//! densest segment mode that fits the text (numeric, alphanumeric or byte), finds the smallest
//! version (1–40) that can hold it at the requested error correction level, appends Reed-Solomon
//! error correction, places the codewords and selects the mask with the lowest penalty.
//!
//! The output is deterministic: the same text, level and boost flag always yield the same matrix.

use thiserror::Error;

/// A QR Code symbol, representing a square grid of dark and light modules.
///
/// Instances are immutable after creation and own their module grid.
///
/// # Example
///
/// ```rust
/// use qrcraft::qrcode::{QrCode, QrCodeEcc};
///
/// let qr = QrCode::encode_text("HELLO WORLD", QrCodeEcc::Low, true).unwrap();
/// assert_eq!(qr.size(), 21);
/// assert_eq!(qr.error_correction_level(), QrCodeEcc::Quartile);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QrCode {
    version: Version,
    size: i32,
    ecc: QrCodeEcc,
    mask: Mask,
    modules: Vec<bool>,
    // Only meaningful while the symbol is being built; emptied afterwards.
    function: Vec<bool>,
}

impl QrCode {
    /// Encodes a text string into a QR code.
    ///
    /// Automatically selects the smallest version that can hold the data. If `boost_ecc` is
    /// `true`, the error correction level is raised as long as that does not grow the version.
    ///
    /// # Errors
    ///
    /// Returns [`DataTooLong`] if the text does not fit in a version 40 symbol at `ecc`.
    pub fn encode_text(text: &str, ecc: QrCodeEcc, boost_ecc: bool) -> Result<Self, DataTooLong> {
        let segs = QrSegment::make_segments(text);
        Self::encode_segments(&segs, ecc, Version::MIN, Version::MAX, None, boost_ecc)
    }

    /// Encodes pre-built segments, constrained to the version range `[min_version, max_version]`.
    ///
    /// `mask` can be `None` for automatic selection (slower) or a fixed pattern.
    pub fn encode_segments(
        segs: &[QrSegment],
        mut ecc: QrCodeEcc,
        min_version: Version,
        max_version: Version,
        mask: Option<Mask>,
        boost_ecc: bool,
    ) -> Result<Self, DataTooLong> {
        debug_assert!(min_version <= max_version);

        let mut version = min_version;
        let used_bits = loop {
            let capacity_bits = num_data_codewords(version, ecc) * 8;
            let used = QrSegment::total_bits(segs, version);
            match used {
                Some(n) if n <= capacity_bits => break n,
                _ if version >= max_version => {
                    return Err(match used {
                        None => DataTooLong::SegmentTooLong,
                        Some(n) => DataTooLong::DataOverCapacity(n, capacity_bits),
                    });
                }
                _ => version = Version::new(version.value() + 1),
            }
        };

        for candidate in [QrCodeEcc::Medium, QrCodeEcc::Quartile, QrCodeEcc::High] {
            if boost_ecc && used_bits <= num_data_codewords(version, candidate) * 8 {
                ecc = candidate;
            }
        }

        let capacity_bits = num_data_codewords(version, ecc) * 8;
        let mut bb = BitBuffer::default();
        for seg in segs {
            bb.append_bits(seg.mode.mode_bits(), 4);
            bb.append_bits(seg.numchars as u32, seg.mode.num_char_count_bits(version));
            bb.0.extend_from_slice(&seg.data);
        }
        debug_assert_eq!(bb.len(), used_bits);

        // Terminator, then pad to a byte boundary.
        let terminator = (capacity_bits - bb.len()).min(4);
        bb.append_bits(0, terminator as u8);
        let fill = bb.len().wrapping_neg() & 7;
        bb.append_bits(0, fill as u8);

        for pad in [0xEC, 0x11].into_iter().cycle() {
            if bb.len() >= capacity_bits {
                break;
            }
            bb.append_bits(pad, 8);
        }

        let mut codewords = vec![0u8; bb.len() / 8];
        for (i, &bit) in bb.0.iter().enumerate() {
            codewords[i >> 3] |= u8::from(bit) << (7 - (i & 7));
        }
        Ok(Self::encode_codewords(version, ecc, &codewords, mask))
    }

    /// Builds the symbol from finished data codewords.
    fn encode_codewords(version: Version, ecc: QrCodeEcc, data: &[u8], mask: Option<Mask>) -> Self {
        let size = i32::from(version.value()) * 4 + 17;
        let cells = (size * size) as usize;
        let mut qr = Self {
            version,
            size,
            ecc,
            mask: Mask::new(0),
            modules: vec![false; cells],
            function: vec![false; cells],
        };
        qr.draw_function_patterns();
        let all_codewords = qr.add_ecc_and_interleave(data);
        qr.draw_codewords(&all_codewords);

        let mask = mask.unwrap_or_else(|| {
            let mut best = Mask::new(0);
            let mut min_penalty = i32::MAX;
            for value in 0u8..8 {
                let candidate = Mask::new(value);
                qr.apply_mask(candidate);
                qr.draw_format_bits(candidate);
                let penalty = qr.penalty_score();
                if penalty < min_penalty {
                    best = candidate;
                    min_penalty = penalty;
                }
                qr.apply_mask(candidate); // XOR undoes it
            }
            best
        });
        qr.mask = mask;
        qr.apply_mask(mask);
        qr.draw_format_bits(mask);
        qr.function = Vec::new();
        qr
    }

    /// Returns this QR Code's version, in the range [1, 40].
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns this QR Code's size in modules, in the range [21, 177].
    pub fn size(&self) -> i32 {
        self.size
    }

    /// Returns the error correction level actually used, after any boost.
    pub fn error_correction_level(&self) -> QrCodeEcc {
        self.ecc
    }

    /// Returns the mask pattern that was applied.
    pub fn mask(&self) -> Mask {
        self.mask
    }

    /// Returns `true` for a dark module. Coordinates outside the symbol are light.
    pub fn get_module(&self, x: i32, y: i32) -> bool {
        let range = 0..self.size;
        range.contains(&x) && range.contains(&y) && self.modules[self.index(x, y)]
    }

    fn index(&self, x: i32, y: i32) -> usize {
        (y * self.size + x) as usize
    }

    fn set_function_module(&mut self, x: i32, y: i32, dark: bool) {
        let i = self.index(x, y);
        self.modules[i] = dark;
        self.function[i] = true;
    }

    fn draw_function_patterns(&mut self) {
        let size = self.size;
        for i in 0..size {
            self.set_function_module(6, i, i % 2 == 0);
            self.set_function_module(i, 6, i % 2 == 0);
        }

        self.draw_finder_pattern(3, 3);
        self.draw_finder_pattern(size - 4, 3);
        self.draw_finder_pattern(3, size - 4);

        let positions = self.alignment_pattern_positions();
        let last = positions.len().saturating_sub(1);
        for (i, &px) in positions.iter().enumerate() {
            for (j, &py) in positions.iter().enumerate() {
                let overlaps_finder = (i == 0 && j == 0) || (i == 0 && j == last) || (i == last && j == 0);
                if !overlaps_finder {
                    self.draw_alignment_pattern(px, py);
                }
            }
        }

        // Reserve the format area; real bits are drawn once the mask is known.
        self.draw_format_bits(Mask::new(0));
        self.draw_version();
    }

    fn draw_finder_pattern(&mut self, x: i32, y: i32) {
        for dy in -4..=4 {
            for dx in -4..=4 {
                let (xx, yy) = (x + dx, y + dy);
                if (0..self.size).contains(&xx) && (0..self.size).contains(&yy) {
                    let dist = dx.abs().max(dy.abs());
                    self.set_function_module(xx, yy, dist != 2 && dist != 4);
                }
            }
        }
    }

    fn draw_alignment_pattern(&mut self, x: i32, y: i32) {
        for dy in -2..=2 {
            for dx in -2..=2 {
                self.set_function_module(x + dx, y + dy, dx.abs().max(dy.abs()) != 1);
            }
        }
    }

    fn draw_format_bits(&mut self, mask: Mask) {
        let bits: u32 = {
            let data = u32::from((self.ecc.format_bits() << 3) | mask.value());
            let mut rem = data;
            for _ in 0..10 {
                rem = (rem << 1) ^ ((rem >> 9) * 0x537);
            }
            ((data << 10) | rem) ^ 0x5412
        };

        // First copy, around the top-left finder.
        for i in 0..6 {
            self.set_function_module(8, i, get_bit(bits, i));
        }
        self.set_function_module(8, 7, get_bit(bits, 6));
        self.set_function_module(8, 8, get_bit(bits, 7));
        self.set_function_module(7, 8, get_bit(bits, 8));
        for i in 9..15 {
            self.set_function_module(14 - i, 8, get_bit(bits, i));
        }

        // Second copy, split between the other two finders.
        let size = self.size;
        for i in 0..8 {
            self.set_function_module(size - 1 - i, 8, get_bit(bits, i));
        }
        for i in 8..15 {
            self.set_function_module(8, size - 15 + i, get_bit(bits, i));
        }
        self.set_function_module(8, size - 8, true);
    }

    fn draw_version(&mut self) {
        if self.version.value() < 7 {
            return;
        }
        let ver = u32::from(self.version.value());
        let mut rem = ver;
        for _ in 0..12 {
            rem = (rem << 1) ^ ((rem >> 11) * 0x1F25);
        }
        let bits = (ver << 12) | rem;
        for i in 0..18 {
            let bit = get_bit(bits, i);
            let a = self.size - 11 + i % 3;
            let b = i / 3;
            self.set_function_module(a, b, bit);
            self.set_function_module(b, a, bit);
        }
    }

    fn alignment_pattern_positions(&self) -> Vec<i32> {
        let ver = i32::from(self.version.value());
        if ver == 1 {
            return Vec::new();
        }
        let count = ver / 7 + 2;
        let step = if ver == 32 { 26 } else { ((ver * 4 + count * 2 + 1) / (count * 2 - 2)) * 2 };
        let mut positions: Vec<i32> = (0..count - 1).map(|i| self.size - 7 - i * step).collect();
        positions.push(6);
        positions.reverse();
        positions
    }

    fn add_ecc_and_interleave(&self, data: &[u8]) -> Vec<u8> {
        debug_assert_eq!(data.len(), num_data_codewords(self.version, self.ecc));
        let num_blocks = table_get(&NUM_ERROR_CORRECTION_BLOCKS, self.version, self.ecc);
        let block_ecc_len = table_get(&ECC_CODEWORDS_PER_BLOCK, self.version, self.ecc);
        let raw_codewords = num_raw_data_modules(self.version) / 8;
        let num_short_blocks = num_blocks - raw_codewords % num_blocks;
        let short_block_len = raw_codewords / num_blocks;

        let rs = ReedSolomonGenerator::new(block_ecc_len);
        let mut blocks: Vec<Vec<u8>> = Vec::with_capacity(num_blocks);
        let mut offset = 0;
        for i in 0..num_blocks {
            let data_len = short_block_len - block_ecc_len + usize::from(i >= num_short_blocks);
            let mut block = data[offset..offset + data_len].to_vec();
            offset += data_len;
            let ecc = rs.remainder(&block);
            if i < num_short_blocks {
                // Placeholder keeps every block the same length; skipped below.
                block.push(0);
            }
            block.extend_from_slice(&ecc);
            blocks.push(block);
        }

        let mut result = Vec::with_capacity(raw_codewords);
        for i in 0..=short_block_len {
            for (j, block) in blocks.iter().enumerate() {
                if i != short_block_len - block_ecc_len || j >= num_short_blocks {
                    result.push(block[i]);
                }
            }
        }
        debug_assert_eq!(result.len(), raw_codewords);
        result
    }

    fn draw_codewords(&mut self, data: &[u8]) {
        let total_bits = data.len() * 8;
        let mut i = 0usize;
        let mut right = self.size - 1;
        while right >= 1 {
            if right == 6 {
                right = 5;
            }
            for vert in 0..self.size {
                for j in 0..2 {
                    let x = right - j;
                    let upward = (right + 1) & 2 == 0;
                    let y = if upward { self.size - 1 - vert } else { vert };
                    let idx = self.index(x, y);
                    if !self.function[idx] && i < total_bits {
                        self.modules[idx] = get_bit(u32::from(data[i >> 3]), 7 - (i & 7) as i32);
                        i += 1;
                    }
                }
            }
            right -= 2;
        }
        debug_assert_eq!(i, total_bits);
    }

    fn apply_mask(&mut self, mask: Mask) {
        for y in 0..self.size {
            for x in 0..self.size {
                let idx = self.index(x, y);
                if self.function[idx] {
                    continue;
                }
                let invert = match mask.value() {
                    0 => (x + y) % 2 == 0,
                    1 => y % 2 == 0,
                    2 => x % 3 == 0,
                    3 => (x + y) % 3 == 0,
                    4 => (x / 3 + y / 2) % 2 == 0,
                    5 => (x * y) % 2 + (x * y) % 3 == 0,
                    6 => ((x * y) % 2 + (x * y) % 3) % 2 == 0,
                    7 => ((x + y) % 2 + (x * y) % 3) % 2 == 0,
                    _ => unreachable!(),
                };
                self.modules[idx] ^= invert;
            }
        }
    }

    fn penalty_score(&self) -> i32 {
        let size = self.size;
        let mut result = 0;

        for y in 0..size {
            result += self.line_penalty((0..size).map(|x| self.get_module(x, y)));
        }
        for x in 0..size {
            result += self.line_penalty((0..size).map(|y| self.get_module(x, y)));
        }

        for y in 0..size - 1 {
            for x in 0..size - 1 {
                let color = self.get_module(x, y);
                if color == self.get_module(x + 1, y)
                    && color == self.get_module(x, y + 1)
                    && color == self.get_module(x + 1, y + 1)
                {
                    result += PENALTY_N2;
                }
            }
        }

        let dark = self.modules.iter().filter(|&&m| m).count() as i32;
        let total = size * size;
        let k = ((dark * 20 - total * 10).abs() + total - 1) / total - 1;
        result + k * PENALTY_N4
    }

    /// Runs-of-same-color and finder-like penalties for one row or column.
    fn line_penalty(&self, line: impl Iterator<Item = bool>) -> i32 {
        let mut result = 0;
        let mut run_color = false;
        let mut run_len = 0;
        let mut history = FinderPenalty::new(self.size);
        for module in line {
            if module == run_color {
                run_len += 1;
                if run_len == 5 {
                    result += PENALTY_N1;
                } else if run_len > 5 {
                    result += 1;
                }
            } else {
                history.add_history(run_len);
                if !run_color {
                    result += history.count_patterns() * PENALTY_N3;
                }
                run_color = module;
                run_len = 1;
            }
        }
        result + history.terminate_and_count(run_color, run_len) * PENALTY_N3
    }
}

fn num_raw_data_modules(ver: Version) -> usize {
    let ver = usize::from(ver.value());
    let mut result = (16 * ver + 128) * ver + 64;
    if ver >= 2 {
        let num_align = ver / 7 + 2;
        result -= (25 * num_align - 10) * num_align - 55;
        if ver >= 7 {
            result -= 36;
        }
    }
    result
}

fn num_data_codewords(ver: Version, ecc: QrCodeEcc) -> usize {
    num_raw_data_modules(ver) / 8
        - table_get(&ECC_CODEWORDS_PER_BLOCK, ver, ecc) * table_get(&NUM_ERROR_CORRECTION_BLOCKS, ver, ecc)
}

fn table_get(table: &'static [[i8; 41]; 4], ver: Version, ecc: QrCodeEcc) -> usize {
    table[ecc.ordinal()][usize::from(ver.value())] as usize
}

fn get_bit(x: u32, i: i32) -> bool {
    (x >> i) & 1 != 0
}

struct ReedSolomonGenerator {
    divisor: Vec<u8>,
}

impl ReedSolomonGenerator {
    fn new(degree: usize) -> Self {
        debug_assert!((1..=30).contains(&degree));
        let mut divisor = vec![0u8; degree];
        divisor[degree - 1] = 1;
        let mut root: u8 = 1;
        for _ in 0..degree {
            for j in 0..degree {
                divisor[j] = Self::multiply(divisor[j], root);
                if j + 1 < degree {
                    divisor[j] ^= divisor[j + 1];
                }
            }
            root = Self::multiply(root, 0x02);
        }
        Self { divisor }
    }

    fn remainder(&self, data: &[u8]) -> Vec<u8> {
        let mut result = vec![0u8; self.divisor.len()];
        for &b in data {
            let factor = b ^ result.remove(0);
            result.push(0);
            for (x, &y) in result.iter_mut().zip(&self.divisor) {
                *x ^= Self::multiply(y, factor);
            }
        }
        result
    }

    // GF(2^8) product modulo x^8 + x^4 + x^3 + x^2 + 1.
    fn multiply(x: u8, y: u8) -> u8 {
        let mut z: u8 = 0;
        for i in (0..8).rev() {
            z = (z << 1) ^ ((z >> 7) * 0x1D);
            z ^= ((y >> i) & 1) * x;
        }
        z
    }
}

struct FinderPenalty {
    qr_size: i32,
    run_history: [i32; 7],
}

impl FinderPenalty {
    fn new(size: i32) -> Self {
        Self {
            qr_size: size,
            run_history: [0; 7],
        }
    }

    fn add_history(&mut self, mut run_len: i32) {
        if self.run_history[0] == 0 {
            run_len += self.qr_size; // light border
        }
        self.run_history.copy_within(0..6, 1);
        self.run_history[0] = run_len;
    }

    fn count_patterns(&self) -> i32 {
        let rh = &self.run_history;
        let n = rh[1];
        let core = n > 0 && rh[2] == n && rh[3] == n * 3 && rh[4] == n && rh[5] == n;
        i32::from(core && rh[0] >= n * 4 && rh[6] >= n) + i32::from(core && rh[6] >= n * 4 && rh[0] >= n)
    }

    fn terminate_and_count(mut self, run_color: bool, mut run_len: i32) -> i32 {
        if run_color {
            self.add_history(run_len);
            run_len = 0;
        }
        run_len += self.qr_size;
        self.add_history(run_len);
        self.count_patterns()
    }
}

const PENALTY_N1: i32 = 3;
const PENALTY_N2: i32 = 3;
const PENALTY_N3: i32 = 40;
const PENALTY_N4: i32 = 10;

static ECC_CODEWORDS_PER_BLOCK: [[i8; 41]; 4] = [
    [
        -1, 7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28, 30,
        30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Low
    [
        -1, 10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28, 28,
        28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28,
    ], // Medium
    [
        -1, 13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30, 30,
        30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Quartile
    [
        -1, 17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24, 30,
        30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // High
];

static NUM_ERROR_CORRECTION_BLOCKS: [[i8; 41]; 4] = [
    [
        -1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 4, 4, 4, 4, 4, 6, 6, 6, 6, 7, 8, 8, 9, 9, 10, 12, 12, 12,
        13, 14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25,
    ], // Low
    [
        -1, 1, 1, 1, 2, 2, 4, 4, 4, 5, 5, 5, 8, 9, 9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21,
        23, 25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49,
    ], // Medium
    [
        -1, 1, 1, 2, 2, 4, 4, 6, 6, 8, 8, 8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27, 29,
        34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68,
    ], // Quartile
    [
        -1, 1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32, 35,
        37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81,
    ], // High
];

/// Error correction level for a QR code.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum QrCodeEcc {
    /// Tolerates ~7% erroneous codewords.
    Low,
    /// Tolerates ~15% erroneous codewords.
    Medium,
    /// Tolerates ~25% erroneous codewords.
    Quartile,
    /// Tolerates ~30% erroneous codewords.
    High,
}

impl QrCodeEcc {
    fn ordinal(self) -> usize {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::Quartile => 2,
            Self::High => 3,
        }
    }

    fn format_bits(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 0,
            Self::Quartile => 3,
            Self::High => 2,
        }
    }
}

/// A segment of data in a QR code: a mode, a character count and the encoded bits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QrSegment {
    mode: QrSegmentMode,
    numchars: usize,
    data: Vec<bool>,
}

impl QrSegment {
    /// Picks a single segment in the densest mode that can represent `text`.
    pub fn make_segments(text: &str) -> Vec<Self> {
        if text.is_empty() {
            Vec::new()
        } else if let Some(seg) = Self::make_numeric(text) {
            vec![seg]
        } else if let Some(seg) = Self::make_alphanumeric(text) {
            vec![seg]
        } else {
            vec![Self::make_bytes(text.as_bytes())]
        }
    }

    /// Creates a byte-mode segment.
    pub fn make_bytes(data: &[u8]) -> Self {
        let mut bb = BitBuffer::default();
        for &b in data {
            bb.append_bits(u32::from(b), 8);
        }
        Self {
            mode: QrSegmentMode::Byte,
            numchars: data.len(),
            data: bb.0,
        }
    }

    /// Creates a numeric-mode segment, or `None` if `text` has a non-digit.
    pub fn make_numeric(text: &str) -> Option<Self> {
        if !Self::is_numeric(text) {
            return None;
        }
        let mut bb = BitBuffer::default();
        for chunk in text.as_bytes().chunks(3) {
            let value = chunk.iter().fold(0u32, |acc, &b| acc * 10 + u32::from(b - b'0'));
            bb.append_bits(value, chunk.len() as u8 * 3 + 1);
        }
        Some(Self {
            mode: QrSegmentMode::Numeric,
            numchars: text.len(),
            data: bb.0,
        })
    }

    /// Creates an alphanumeric-mode segment, or `None` if `text` falls outside the charset.
    ///
    /// Allowed characters: 0–9, A–Z (uppercase), space, `$`, `%`, `*`, `+`, `-`, `.`, `/`, `:`.
    pub fn make_alphanumeric(text: &str) -> Option<Self> {
        let values = text
            .chars()
            .map(|c| ALPHANUMERIC_CHARSET.find(c).map(|i| i as u32))
            .collect::<Option<Vec<u32>>>()?;
        let mut bb = BitBuffer::default();
        for pair in values.chunks(2) {
            match *pair {
                [a, b] => bb.append_bits(a * 45 + b, 11),
                [a] => bb.append_bits(a, 6),
                _ => {}
            }
        }
        Some(Self {
            mode: QrSegmentMode::Alphanumeric,
            numchars: values.len(),
            data: bb.0,
        })
    }

    pub fn mode(&self) -> QrSegmentMode {
        self.mode
    }

    pub fn num_chars(&self) -> usize {
        self.numchars
    }

    fn total_bits(segs: &[Self], version: Version) -> Option<usize> {
        let mut result: usize = 0;
        for seg in segs {
            let cc_bits = seg.mode.num_char_count_bits(version);
            if seg.numchars >= 1usize << cc_bits {
                return None;
            }
            result = result.checked_add(4 + usize::from(cc_bits))?;
            result = result.checked_add(seg.data.len())?;
        }
        Some(result)
    }

    pub fn is_numeric(text: &str) -> bool {
        text.bytes().all(|b| b.is_ascii_digit())
    }

    pub fn is_alphanumeric(text: &str) -> bool {
        text.chars().all(|c| ALPHANUMERIC_CHARSET.contains(c))
    }
}

static ALPHANUMERIC_CHARSET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

/// Segment encoding mode.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum QrSegmentMode {
    Numeric,
    Alphanumeric,
    Byte,
}

impl QrSegmentMode {
    fn mode_bits(self) -> u32 {
        match self {
            Self::Numeric => 0x1,
            Self::Alphanumeric => 0x2,
            Self::Byte => 0x4,
        }
    }

    fn num_char_count_bits(self, ver: Version) -> u8 {
        let widths = match self {
            Self::Numeric => [10, 12, 14],
            Self::Alphanumeric => [9, 11, 13],
            Self::Byte => [8, 16, 16],
        };
        widths[usize::from((ver.value() + 7) / 17)]
    }
}

#[derive(Default)]
struct BitBuffer(Vec<bool>);

impl BitBuffer {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn append_bits(&mut self, val: u32, len: u8) {
        debug_assert!(len <= 31 && val >> len == 0);
        self.0.extend((0..len).rev().map(|i| (val >> i) & 1 != 0));
    }
}

/// Returned when the data does not fit in the largest allowed version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataTooLong {
    /// A segment's character count overflows its count field.
    #[error("segment too long")]
    SegmentTooLong,
    /// Data length exceeds capacity: (used bits, capacity bits).
    #[error("data length = {0} bits, max capacity = {1} bits")]
    DataOverCapacity(usize, usize),
}

/// A QR code version (1–40).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Version(u8);

impl Version {
    /// The minimum version number supported in the QR Code Model 2 standard.
    pub const MIN: Version = Version(1);

    /// The maximum version number supported in the QR Code Model 2 standard.
    pub const MAX: Version = Version(40);

    /// # Panics
    ///
    /// Panics if the number is outside the range [1, 40].
    pub const fn new(ver: u8) -> Self {
        assert!(Version::MIN.value() <= ver && ver <= Version::MAX.value(), "Version number out of range");
        Self(ver)
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

/// A mask pattern (0–7).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Mask(u8);

impl Mask {
    /// # Panics
    ///
    /// Panics if the number is outside the range [0, 7].
    pub const fn new(mask: u8) -> Self {
        assert!(mask <= 7, "Mask value out of range");
        Self(mask)
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric() {
        assert!(QrSegment::is_numeric("1234567890"));
        assert!(!QrSegment::is_numeric("1234abc"));
    }

    #[test]
    fn test_is_alphanumeric() {
        assert!(QrSegment::is_alphanumeric("HELLO WORLD"));
        assert!(!QrSegment::is_alphanumeric("Hello World"));
    }

    #[test]
    fn test_segment_mode_selection() {
        assert_eq!(QrSegment::make_segments("0123")[0].mode(), QrSegmentMode::Numeric);
        assert_eq!(QrSegment::make_segments("WIFI:T:WPA")[0].mode(), QrSegmentMode::Alphanumeric);
        assert_eq!(QrSegment::make_segments("https://wa.me/1")[0].mode(), QrSegmentMode::Byte);
        assert!(QrSegment::make_segments("").is_empty());
    }

    #[test]
    fn test_numeric_bit_length() {
        // 3 digits -> 10 bits, 2 digits -> 7 bits, 1 digit -> 4 bits
        let seg = QrSegment::make_numeric("0123456").unwrap();
        assert_eq!(seg.data.len(), 10 + 10 + 4);
        assert_eq!(seg.num_chars(), 7);
    }

    #[test]
    fn test_hello_world_is_version_one_quartile() {
        let qr = QrCode::encode_text("HELLO WORLD", QrCodeEcc::Low, true).unwrap();
        assert_eq!(qr.version(), Version::new(1));
        assert_eq!(qr.size(), 21);
        assert_eq!(qr.error_correction_level(), QrCodeEcc::Quartile);
    }

    #[test]
    fn test_byte_text_boosts_to_medium() {
        let qr = QrCode::encode_text("Hello, world!", QrCodeEcc::Low, true).unwrap();
        assert_eq!(qr.size(), 21);
        assert_eq!(qr.error_correction_level(), QrCodeEcc::Medium);

        let plain = QrCode::encode_text("Hello, world!", QrCodeEcc::Low, false).unwrap();
        assert_eq!(plain.error_correction_level(), QrCodeEcc::Low);
    }

    #[test]
    fn test_finder_pattern_corners() {
        let qr = QrCode::encode_text("https://example.com", QrCodeEcc::Medium, true).unwrap();
        let far = qr.size() - 1;
        for (x, y) in [(0, 0), (far, 0), (0, far)] {
            assert!(qr.get_module(x, y), "corner ({x},{y}) should be dark");
        }
        // Separator ring two modules in from the top-left corner is light.
        assert!(!qr.get_module(1, 1));
        assert!(qr.get_module(2, 2));
        // Dark module above the bottom-left format area.
        assert!(qr.get_module(8, qr.size() - 8));
        assert!(!qr.get_module(-1, 0));
        assert!(!qr.get_module(0, qr.size()));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let a = QrCode::encode_text("geo:52.37,4.89", QrCodeEcc::High, true).unwrap();
        let b = QrCode::encode_text("geo:52.37,4.89", QrCodeEcc::High, true).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_larger_payload_grows_version() {
        let text = "BEGIN:VCARD\nVERSION:3.0\nN:Doe;Jane\nFN:Jane Doe\nTEL:+1 555 0100\nEMAIL:jane@example.com\nORG:Acme\nURL:https://acme.example\nEND:VCARD";
        let qr = QrCode::encode_text(text, QrCodeEcc::High, false).unwrap();
        assert!(qr.version().value() >= 7);
        assert_eq!(qr.size(), i32::from(qr.version().value()) * 4 + 17);
    }

    #[test]
    fn test_data_too_long() {
        let text = "x".repeat(3000);
        let err = QrCode::encode_text(&text, QrCodeEcc::High, true).unwrap_err();
        assert!(matches!(err, DataTooLong::DataOverCapacity(_, _)));
    }

    #[test]
    fn test_reed_solomon_remainder_length() {
        let rs = ReedSolomonGenerator::new(10);
        assert_eq!(rs.remainder(&[0x10, 0x20, 0x0C]).len(), 10);
        assert_eq!(rs.remainder(&[0, 0, 0]), vec![0; 10]);
    }
}
