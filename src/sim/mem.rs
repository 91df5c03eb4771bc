//! Memory handling for the LEGv8 simulator.
//!
//! This module consists of:
//! - [`Memory`]: The sparse, block-paged memory.
//! - [`RegFile`]: The register file and its zero-register rules.
//! - [`Filler`] and [`FillStrategy`]: The machinery producing the contents
//!   of uninitialized registers and memory.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::rngs::StdRng;
use rand::RngCore;

use crate::ast::Reg;

/// The size of one memory block, in bytes.
pub const BLOCK_SIZE: u64 = 1 << 10; // 1KB

/// Trait that describes types that can produce the initial contents of
/// uninitialized registers and memory.
///
/// This is used when the simulator creates its register file and whenever
/// [`Memory`] allocates a block for the first time. A filler is usually
/// obtained from a [`FillStrategy`], but custom implementations can be
/// passed to [`Memory::with_filler`] and [`RegFile::new`].
pub trait Filler {
    /// Fills the buffer with generated data.
    fn fill(&mut self, buf: &mut [u8]);

    /// Generates one 64-bit register value.
    fn next_u64(&mut self) -> u64 {
        let mut buf = [0; 8];
        self.fill(&mut buf);
        u64::from_le_bytes(buf)
    }
}
impl Filler for () {
    /// Unseeded fill draws from the process RNG.
    fn fill(&mut self, buf: &mut [u8]) {
        rand::thread_rng().fill_bytes(buf);
    }
}
impl Filler for u8 {
    /// Fills every byte with this fixed value.
    fn fill(&mut self, buf: &mut [u8]) {
        buf.fill(*self);
    }
}
impl Filler for StdRng {
    /// Draws bytes from a seedable standard RNG, so fills can be made
    /// deterministic.
    fn fill(&mut self, buf: &mut [u8]) {
        self.fill_bytes(buf);
    }
}

/// Strategy used to initialize the registers and memory of the
/// [`Simulator`](super::Simulator).
///
/// Registers and newly touched memory blocks start out holding whatever
/// this strategy produces, modeling "undefined initial state": the default
/// is unseeded random bits, which exposes programs that rely on implicit
/// zeroing. Seeded and known-value strategies make runs reproducible.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum FillStrategy {
    /// Fills randomly and non-deterministically.
    #[default]
    Unseeded,

    /// Fills randomly and deterministically.
    Seeded {
        /// Seed for the RNG.
        seed: u64,
    },

    /// Fills every byte with a known value.
    Known {
        /// The value each byte is set to.
        value: u8,
    },
}

impl FillStrategy {
    pub(crate) fn filler(&self) -> impl Filler + Send {
        use rand::SeedableRng;

        match self {
            FillStrategy::Unseeded => Gen::Unseeded,
            FillStrategy::Seeded { seed } => Gen::Seeded(Box::new(StdRng::seed_from_u64(*seed))),
            FillStrategy::Known { value } => Gen::Known(*value),
        }
    }
}

enum Gen {
    Unseeded,
    Seeded(Box<StdRng>),
    Known(u8),
}
impl Filler for Gen {
    fn fill(&mut self, buf: &mut [u8]) {
        match self {
            Gen::Unseeded => ().fill(buf),
            Gen::Seeded(r) => r.fill(buf),
            Gen::Known(v) => v.fill(buf),
        }
    }
}

type Block = Box<[u8; BLOCK_SIZE as usize]>;

struct MemInner {
    blocks: HashMap<u64, Block>,
    filler: Box<dyn Filler + Send>,
}

impl MemInner {
    /// Gets the block containing `addr`, allocating it on first touch.
    fn block(&mut self, addr: u64) -> &mut Block {
        match self.blocks.entry(addr / BLOCK_SIZE) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                let mut block: Block = Box::new([0; BLOCK_SIZE as usize]);
                self.filler.fill(&mut block[..]);
                e.insert(block)
            }
        }
    }
}

/// Memory.
///
/// A sparse byte store addressable with any 64-bit address. Storage is
/// divided into [`BLOCK_SIZE`]-byte blocks, allocated the first time an
/// address inside them is touched and initialized by the memory's
/// [`Filler`]. Once a block exists, it is never freed.
///
/// [`Memory::read`] and [`Memory::write`] never fail: they allocate
/// whatever blocks they need and traverse block boundaries transparently.
/// Address arithmetic wraps at the top of the address space. Memory has no
/// opinion on endianness; multi-byte interpretation is the caller's
/// concern.
///
/// The block map is guarded by a mutex, so memory can be shared with
/// observer threads that inspect or modify it between simulator steps.
/// Accesses are locked for their whole duration; the design still assumes
/// a single mutating thread.
///
/// ```
/// use legv8_ensemble::sim::mem::{FillStrategy, Memory};
///
/// let mem = Memory::new(FillStrategy::Known { value: 0 });
/// mem.write(&[1, 2, 3], 1000);
///
/// let mut buf = [0; 3];
/// mem.read(&mut buf, 1000);
/// assert_eq!(buf, [1, 2, 3]);
/// ```
pub struct Memory {
    inner: Mutex<MemInner>,
}

impl Memory {
    /// Creates an empty memory using the given fill strategy for newly
    /// allocated blocks.
    pub fn new(strategy: FillStrategy) -> Self {
        Self::with_filler(strategy.filler())
    }

    /// Creates an empty memory with a custom block filler.
    pub fn with_filler(filler: impl Filler + Send + 'static) -> Self {
        Memory {
            inner: Mutex::new(MemInner { blocks: HashMap::new(), filler: Box::new(filler) }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fills `buf` with the bytes starting at `addr`.
    ///
    /// Blocks not present yet are allocated (with filler-generated
    /// contents) as the read crosses them, so the whole buffer is always
    /// filled.
    pub fn read(&self, buf: &mut [u8], addr: u64) {
        let mut inner = self.lock();

        let total = buf.len();
        let mut n = 0;
        while n < total {
            let at = addr.wrapping_add(n as u64);
            let off = (at % BLOCK_SIZE) as usize;
            let len = (BLOCK_SIZE as usize - off).min(total - n);
            buf[n..n + len].copy_from_slice(&inner.block(at)[off..off + len]);
            n += len;
        }
    }

    /// Writes all of `buf` to the bytes starting at `addr`.
    ///
    /// Symmetric to [`Memory::read`]: missing blocks are allocated and the
    /// write spans them.
    pub fn write(&self, buf: &[u8], addr: u64) {
        let mut inner = self.lock();

        let total = buf.len();
        let mut n = 0;
        while n < total {
            let at = addr.wrapping_add(n as u64);
            let off = (at % BLOCK_SIZE) as usize;
            let len = (BLOCK_SIZE as usize - off).min(total - n);
            inner.block(at)[off..off + len].copy_from_slice(&buf[n..n + len]);
            n += len;
        }
    }

    /// The number of blocks currently allocated.
    ///
    /// This is only meant for inspecting the state of the memory (e.g., in
    /// tests); allocation is monotonic, so the count never decreases.
    pub fn blocks_allocated(&self) -> usize {
        self.lock().blocks.len()
    }
}
impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("blocks_allocated", &self.blocks_allocated())
            .finish_non_exhaustive()
    }
}

/// The bank of registers backing the simulator.
///
/// Reads and writes go through [`RegFile::get`] and [`RegFile::set`],
/// which implement the zero-register semantics: `XZR` reads as 0 and
/// discards writes. The floating-point banks are placeholders; they read
/// as 0 and discard writes as well.
///
/// # Example
///
/// ```
/// use legv8_ensemble::ast::reg_consts::{X0, XZR};
/// use legv8_ensemble::sim::mem::RegFile;
///
/// let mut reg = RegFile::new(&mut 0u8);
/// reg.set(X0, 11);
/// assert_eq!(reg.get(X0), 11);
///
/// reg.set(XZR, 11);
/// assert_eq!(reg.get(XZR), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegFile([u64; 32]);

impl RegFile {
    /// Creates a register file, seeding all 32 registers from the filler.
    pub fn new(filler: &mut impl Filler) -> Self {
        Self(std::array::from_fn(|_| filler.next_u64()))
    }

    /// Reads a register. `XZR` always reads as 0.
    pub fn get(&self, reg: Reg) -> u64 {
        match reg.0 {
            31 => 0, // XZR
            n @ 0..=30 => self.0[usize::from(n)],
            _ => 0, // float banks are not modeled
        }
    }

    /// Writes a register. Writes to `XZR` are discarded.
    pub fn set(&mut self, reg: Reg, value: u64) {
        if let n @ 0..=30 = reg.0 {
            self.0[usize::from(n)] = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::reg_consts::*;
    use crate::ast::{Reg, RegBank};

    #[test]
    fn test_read_after_write() {
        let mem = Memory::new(FillStrategy::default());
        let data = [0xDE, 0xAD, 0xBE, 0xEF];
        mem.write(&data, 0x1234);

        let mut buf = [0; 4];
        mem.read(&mut buf, 0x1234);
        assert_eq!(buf, data);
    }

    #[test]
    fn test_block_boundary() {
        // bytes 0..8 live in block 0, bytes 8..16 in block 1
        let mem = Memory::new(FillStrategy::default());
        let data: Vec<u8> = (0..16).collect();
        mem.write(&data, 1016);
        assert_eq!(mem.blocks_allocated(), 2);

        let mut buf = [0; 16];
        mem.read(&mut buf, 1016);
        assert_eq!(buf[..], data[..]);

        let mut low = [0; 8];
        let mut high = [0; 8];
        mem.read(&mut low, 1016);
        mem.read(&mut high, 1024);
        assert_eq!(low[..], data[..8]);
        assert_eq!(high[..], data[8..]);
    }

    #[test]
    fn test_many_block_spanning_write() {
        let mem = Memory::new(FillStrategy::Known { value: 0 });
        let data = vec![7u8; 5000];
        mem.write(&data, 512);
        assert_eq!(mem.blocks_allocated(), 6);

        let mut buf = vec![0u8; 5000];
        mem.read(&mut buf, 512);
        assert_eq!(buf, data);
    }

    #[test]
    fn test_address_wraparound() {
        let mem = Memory::new(FillStrategy::Known { value: 0 });
        mem.write(&[1, 2, 3, 4], u64::MAX - 1);

        let mut buf = [0; 2];
        mem.read(&mut buf, u64::MAX - 1);
        assert_eq!(buf, [1, 2]);
        mem.read(&mut buf, 0);
        assert_eq!(buf, [3, 4]);
    }

    #[test]
    fn test_known_fill() {
        let mem = Memory::new(FillStrategy::Known { value: 0xAB });
        let mut buf = [0; 32];
        mem.read(&mut buf, 40_000);
        assert_eq!(buf, [0xAB; 32]);
    }

    #[test]
    fn test_seeded_fill_is_deterministic() {
        let a = Memory::new(FillStrategy::Seeded { seed: 99 });
        let b = Memory::new(FillStrategy::Seeded { seed: 99 });

        let (mut buf_a, mut buf_b) = ([0; 64], [0; 64]);
        a.read(&mut buf_a, 123_456);
        b.read(&mut buf_b, 123_456);
        assert_eq!(buf_a, buf_b);
    }

    #[test]
    fn test_allocation_is_monotonic() {
        let mem = Memory::new(FillStrategy::default());
        let mut buf = [0; 1];
        mem.read(&mut buf, 0);
        mem.read(&mut buf, 5000);
        let allocated = mem.blocks_allocated();

        // rereading existing blocks allocates nothing new
        mem.read(&mut buf, 1);
        mem.read(&mut buf, 5001);
        assert_eq!(mem.blocks_allocated(), allocated);
    }

    #[test]
    fn test_reg_file() {
        let mut reg = RegFile::new(&mut 0xAAu8);
        // every register is seeded from the filler
        assert_eq!(reg.get(X3), u64::from_le_bytes([0xAA; 8]));

        reg.set(X3, 77);
        assert_eq!(reg.get(X3), 77);
        assert_eq!(reg.get(SP), u64::from_le_bytes([0xAA; 8]));
    }

    #[test]
    fn test_xzr_reads_zero_and_discards_writes() {
        let mut reg = RegFile::new(&mut ());
        assert_eq!(reg.get(XZR), 0);
        reg.set(XZR, 0x1234);
        assert_eq!(reg.get(XZR), 0);
    }

    #[test]
    fn test_float_banks_are_placeholders() {
        let mut reg = RegFile::new(&mut 0xFFu8);
        let s0 = Reg::new(RegBank::S, 0).unwrap();
        assert_eq!(reg.get(s0), 0);
        reg.set(s0, 5);
        assert_eq!(reg.get(s0), 0);
    }
}
