use std::sync::atomic::{AtomicU64, Ordering};

const BITS_PER_WORD: u32 = 64;

/// A growable set of small integer indices (cpu/numa/gpu ids), stored as a
/// vector of 64-bit words rather than a fixed-size mask, since the daemon
/// does not know the host topology size ahead of time.
#[derive(Debug, Clone, Default)]
pub struct Bitmap {
    words: Vec<u64>,
}

impl Bitmap {
    pub fn new() -> Self {
        Bitmap { words: Vec::new() }
    }

    pub fn from_indices(indices: impl IntoIterator<Item = u32>) -> Self {
        let mut b = Bitmap::new();
        for i in indices {
            b.set(i);
        }
        b
    }

    fn word_index(i: u32) -> usize {
        (i / BITS_PER_WORD) as usize
    }

    fn bit_index(i: u32) -> u32 {
        i % BITS_PER_WORD
    }

    pub fn set(&mut self, i: u32) {
        let w = Self::word_index(i);
        if w >= self.words.len() {
            self.words.resize(w + 1, 0);
        }
        self.words[w] |= 1u64 << Self::bit_index(i);
    }

    pub fn is_set(&self, i: u32) -> bool {
        let w = Self::word_index(i);
        self.words
            .get(w)
            .map(|word| word & (1u64 << Self::bit_index(i)) != 0)
            .unwrap_or(false)
    }

    pub fn nset(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Indices of set bits, ascending. Used as the wire representation.
    pub fn to_indices(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.nset());
        for (wi, word) in self.words.iter().enumerate() {
            let mut w = *word;
            while w != 0 {
                let bit = w.trailing_zeros();
                out.push(wi as u32 * BITS_PER_WORD + bit);
                w &= w - 1;
            }
        }
        out
    }

    pub fn union(&self, other: &Bitmap) -> Bitmap {
        let len = self.words.len().max(other.words.len());
        let mut words = vec![0u64; len];
        for (i, w) in self.words.iter().enumerate() {
            words[i] |= w;
        }
        for (i, w) in other.words.iter().enumerate() {
            words[i] |= w;
        }
        Bitmap { words }
    }

    /// Structural equality, ignoring trailing all-zero words so that
    /// bitmaps built to different capacities still compare equal.
    fn trimmed(&self) -> &[u64] {
        let mut end = self.words.len();
        while end > 0 && self.words[end - 1] == 0 {
            end -= 1;
        }
        &self.words[..end]
    }
}

impl PartialEq for Bitmap {
    fn eq(&self, other: &Self) -> bool {
        self.trimmed() == other.trimmed()
    }
}
impl Eq for Bitmap {}

/// An atomic bitmap for concurrent membership tests against a fixed-size
/// resource space (set once at scope-registration time, read from many
/// sensor-dispatch tasks afterward).
pub struct AtomicBitmap {
    words: Vec<AtomicU64>,
}

impl AtomicBitmap {
    pub fn from_bitmap(bitmap: &Bitmap) -> Self {
        AtomicBitmap {
            words: bitmap.words.iter().map(|w| AtomicU64::new(*w)).collect(),
        }
    }

    pub fn set(&self, i: u32) {
        let w = (i / BITS_PER_WORD) as usize;
        if let Some(word) = self.words.get(w) {
            word.fetch_or(1u64 << (i % BITS_PER_WORD), Ordering::Relaxed);
        }
    }

    pub fn is_set(&self, i: u32) -> bool {
        let w = (i / BITS_PER_WORD) as usize;
        self.words
            .get(w)
            .map(|word| word.load(Ordering::Relaxed) & (1u64 << (i % BITS_PER_WORD)) != 0)
            .unwrap_or(false)
    }

    pub fn to_bitmap(&self) -> Bitmap {
        Bitmap {
            words: self.words.iter().map(|w| w.load(Ordering::Relaxed)).collect(),
        }
    }
}
