use core::alloc::Layout;

use thiserror::Error;

/// The error type for the fallible (`try_*`) operations of the map.
///
/// Returned when the table needs to grow and the new storage cannot be
/// obtained. The map is left untouched when this happens: growth allocates
/// the new slot array before any entry is moved out of the old one.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum TryReserveError {
    /// The doubled capacity, or its size in bytes, does not fit in `usize`.
    #[error("capacity overflow")]
    CapacityOverflow,

    /// The allocator returned an error.
    #[error("memory allocation of {} bytes failed", .layout.size())]
    AllocError {
        /// The layout of the allocation request that failed.
        layout: Layout,
    },
}

/// Whether memory allocation errors should return an error or abort.
#[derive(Copy, Clone, Debug)]
pub(crate) enum Fallibility {
    Fallible,
    Infallible,
}

impl Fallibility {
    /// Error to return on capacity overflow.
    #[inline]
    pub(crate) fn capacity_overflow(self) -> TryReserveError {
        match self {
            Fallibility::Fallible => TryReserveError::CapacityOverflow,
            Fallibility::Infallible => panic!("capacity overflow"),
        }
    }

    /// Error to return on allocation error.
    #[inline]
    pub(crate) fn alloc_err(self, layout: Layout) -> TryReserveError {
        match self {
            Fallibility::Fallible => TryReserveError::AllocError { layout },
            Fallibility::Infallible => alloc::alloc::handle_alloc_error(layout),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn fallible_reports_overflow() {
        assert_eq!(
            Fallibility::Fallible.capacity_overflow(),
            TryReserveError::CapacityOverflow
        );
    }

    #[test]
    fn fallible_reports_layout() {
        let layout = Layout::array::<u64>(16).unwrap();
        match Fallibility::Fallible.alloc_err(layout) {
            TryReserveError::AllocError { layout: l } => assert_eq!(l.size(), 128),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    #[should_panic(expected = "capacity overflow")]
    fn infallible_overflow_panics() {
        let _ = Fallibility::Infallible.capacity_overflow();
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            TryReserveError::CapacityOverflow.to_string(),
            "capacity overflow"
        );
        let layout = Layout::array::<u8>(4096).unwrap();
        assert_eq!(
            TryReserveError::AllocError { layout }.to_string(),
            "memory allocation of 4096 bytes failed"
        );
    }
}
