//! Affinity backend abstraction and the CPU mask shared by all backends.

use crate::config::types::Result;

const WORD_BITS: usize = u64::BITS as usize;

/// Bitset of CPU indices a process may be scheduled on.
///
/// Trailing zero words are never stored, so two masks with the same CPUs
/// always compare equal regardless of how they were built.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CpuMask {
    words: Vec<u64>,
}

impl CpuMask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mask permitting exactly one CPU
    pub fn single(cpu: usize) -> Self {
        let mut mask = Self::new();
        mask.set(cpu);
        mask
    }

    /// Build from a machine-word mask (bit N = CPU N)
    pub fn from_bits(bits: u64) -> Self {
        let mut mask = Self { words: vec![bits] };
        mask.trim();
        mask
    }

    /// Low 64 CPUs as a machine-word mask, `None` if any higher CPU is set
    pub fn to_bits(&self) -> Option<u64> {
        match self.words.len() {
            0 => Some(0),
            1 => Some(self.words[0]),
            _ => None,
        }
    }

    pub fn set(&mut self, cpu: usize) {
        let (word, bit) = (cpu / WORD_BITS, cpu % WORD_BITS);
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << bit;
    }

    pub fn is_set(&self, cpu: usize) -> bool {
        self.words
            .get(cpu / WORD_BITS)
            .map_or(false, |word| word & (1u64 << (cpu % WORD_BITS)) != 0)
    }

    /// Lowest permitted CPU index
    pub fn lowest(&self) -> Option<usize> {
        self.iter().next()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(index, &word)| {
            (0..WORD_BITS)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .map(move |bit| index * WORD_BITS + bit)
        })
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    fn trim(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }
}

impl FromIterator<usize> for CpuMask {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut mask = Self::new();
        for cpu in iter {
            mask.set(cpu);
        }
        mask
    }
}

/// Process CPU-affinity API of one platform.
pub trait AffinityBackend {
    fn backend_name(&self) -> &'static str;

    /// `false` for the fallback backend; callers then treat every operation as a no-op.
    fn is_supported(&self) -> bool {
        true
    }

    /// Mask the process is currently restricted to
    fn current_mask(&self) -> Result<CpuMask>;

    /// CPUs the system allows this process to be pinned to
    fn system_mask(&self) -> Result<CpuMask>;

    fn apply_mask(&mut self, mask: &CpuMask) -> Result<()>;
}

/// Pick the CPU a profiling window is pinned to.
///
/// The preferred index wins unless the permitted mask excludes it, in which
/// case the lowest permitted index is used. An empty permitted mask means the
/// platform reported nothing usable and the preferred index is kept.
pub fn select_profiling_cpu(preferred: usize, permitted: &CpuMask) -> usize {
    if permitted.is_empty() || permitted.is_set(preferred) {
        return preferred;
    }
    permitted.lowest().unwrap_or(preferred)
}
