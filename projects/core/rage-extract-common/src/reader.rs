//! Bounds-checked little-endian reads and tagged-pointer resolution.
//!
//! The container's "pointers" are not addresses: bits 28-31 of a 64-bit
//! value select a logical segment and the low 28 bits are an offset within
//! it. [`ReaderContext::resolve`] is the single shared implementation of
//! that translation; every structure reader chases pointers through it, so
//! fixed-layout struct reads behave like pointer walking without any real
//! memory pointers being involved.

use crate::container::ResourceContainer;

/// Segment tag placing an offset directly in the system segment.
const TAG_SYSTEM: u64 = 5;
/// Segment tag placing an offset relative to the end of the system segment.
const TAG_GRAPHICS: u64 = 6;
/// Mask for the 28-bit in-segment offset.
const OFFSET_MASK: u64 = 0x0FFF_FFFF;

/// The defined null offset returned for unresolvable pointers.
pub const NULL_OFFSET: usize = 0;

/// An immutable byte buffer plus the segment boundaries needed to resolve
/// tagged pointers into it.
///
/// All accessors take absolute byte offsets. Reads that fall outside the
/// buffer return the type's zero value; callers treat zero-filled structures
/// as absent rather than erroring.
#[derive(Debug, Clone, Copy)]
pub struct ReaderContext<'a> {
    data: &'a [u8],
    /// Byte size of the system segment.
    pub system_size: usize,
    /// Byte size of the graphics segment.
    pub graphics_size: usize,
}

impl<'a> ReaderContext<'a> {
    /// Creates a reader over an arbitrary buffer with explicit segment sizes.
    pub fn new(data: &'a [u8], system_size: usize, graphics_size: usize) -> Self {
        Self {
            data,
            system_size,
            graphics_size,
        }
    }

    /// Creates a reader over an unpacked container.
    pub fn of(container: &'a ResourceContainer) -> Self {
        Self::new(&container.data, container.system_size, container.graphics_size)
    }

    /// Total buffer length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The underlying buffer.
    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// A sub-slice of up to `len` bytes starting at `at`, clamped to the
    /// buffer. Out-of-range requests yield an empty slice.
    pub fn bytes(&self, at: usize, len: usize) -> &'a [u8] {
        let start = at.min(self.data.len());
        let end = at.saturating_add(len).min(self.data.len());
        &self.data[start..end]
    }

    #[inline]
    fn fixed<const N: usize>(&self, at: usize) -> [u8; N] {
        match self.data.get(at..at + N) {
            Some(b) => b.try_into().unwrap_or([0u8; N]),
            None => [0u8; N],
        }
    }

    /// Reads a byte, 0 when out of range.
    #[inline]
    pub fn u8(&self, at: usize) -> u8 {
        self.data.get(at).copied().unwrap_or(0)
    }

    /// Reads a little-endian u16, 0 when out of range.
    #[inline]
    pub fn u16(&self, at: usize) -> u16 {
        u16::from_le_bytes(self.fixed(at))
    }

    /// Reads a little-endian u32, 0 when out of range.
    #[inline]
    pub fn u32(&self, at: usize) -> u32 {
        u32::from_le_bytes(self.fixed(at))
    }

    /// Reads a little-endian u64, 0 when out of range.
    #[inline]
    pub fn u64(&self, at: usize) -> u64 {
        u64::from_le_bytes(self.fixed(at))
    }

    /// Reads a little-endian i16, 0 when out of range.
    #[inline]
    pub fn i16(&self, at: usize) -> i16 {
        i16::from_le_bytes(self.fixed(at))
    }

    /// Reads a little-endian f32, 0.0 when out of range.
    #[inline]
    pub fn f32(&self, at: usize) -> f32 {
        f32::from_le_bytes(self.fixed(at))
    }

    /// Reads a little-endian half float widened to f32, 0.0 when out of range.
    #[inline]
    pub fn f16(&self, at: usize) -> f32 {
        half::f16::from_le_bytes(self.fixed(at)).to_f32()
    }

    /// Reads a NUL-terminated ASCII string of at most `max` bytes.
    ///
    /// Non-UTF8 bytes are replaced; a missing terminator just truncates at
    /// `max` or the end of the buffer.
    pub fn cstr(&self, at: usize, max: usize) -> String {
        let window = self.bytes(at, max);
        let end = window.iter().position(|&b| b == 0).unwrap_or(window.len());
        String::from_utf8_lossy(&window[..end]).into_owned()
    }

    /// Resolves a tagged pointer to an absolute buffer offset.
    ///
    /// Tag 5 addresses the system segment directly, tag 6 the graphics
    /// segment past `system_size` (falling back to the bare offset when the
    /// sum overshoots the buffer). Any other tag is taken as a literal
    /// offset. Unresolvable values map to [`NULL_OFFSET`].
    pub fn resolve(&self, ptr: u64) -> usize {
        let tag = (ptr >> 28) & 0xF;
        let low = (ptr & OFFSET_MASK) as usize;
        let offset = match tag {
            TAG_SYSTEM => low,
            TAG_GRAPHICS => {
                let shifted = self.system_size.saturating_add(low);
                if shifted < self.data.len() {
                    shifted
                } else {
                    low
                }
            }
            _ => usize::try_from(ptr).unwrap_or(usize::MAX),
        };
        if offset < self.data.len() {
            offset
        } else {
            NULL_OFFSET
        }
    }

    /// True when `ptr` resolves to a usable non-null offset.
    #[inline]
    pub fn valid_ptr(&self, ptr: u64) -> bool {
        let offset = self.resolve(ptr);
        offset > NULL_OFFSET && offset < self.data.len()
    }

    /// Reads a tagged pointer at `at` and resolves it in one step.
    #[inline]
    pub fn deref(&self, at: usize) -> usize {
        self.resolve(self.u64(at))
    }
}
