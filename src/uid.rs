pub trait IntUid: Copy + Eq + Ord {
    type Raw;
    fn new() -> Self;
    fn raw(&self) -> Self::Raw;
}

#[macro_export]
macro_rules! define_nonzero_u32_id_type {
    ($name:ident) => {
        #[derive(PartialEq, Eq, Hash, Copy, Clone, Debug, Ord, PartialOrd)]
        pub struct $name(std::num::NonZeroU32);

        impl crate::IntUid for $name {
            type Raw = std::num::NonZeroU32;

            fn new() -> Self {
                static NEXT_ID: std::sync::atomic::AtomicU32 = std::sync::atomic::AtomicU32::new(1);
                let id = NEXT_ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                return Self(unsafe { std::num::NonZeroU32::new_unchecked(id) })
            }

            fn raw(&self) -> Self::Raw {
                return self.0
            }
        }
    }
}
