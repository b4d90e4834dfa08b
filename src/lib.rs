use std::path::Path;
use fnv::{FnvHashMap, FnvHashSet};

pub mod cvrptw;
pub mod data;
mod uid;
pub use uid::IntUid;

pub type Map<K, V> = FnvHashMap<K, V>;
pub type Set<T> = FnvHashSet<T>;


mod logging_setup {
    use super::*;
    use tracing_subscriber::{EnvFilter, fmt, registry, prelude::*};
    use tracing_appender::{non_blocking, non_blocking::WorkerGuard};
    use std::fs::OpenOptions;

    fn build_and_set_global_subscriber<P>(logfile: Option<P>, is_test : bool) -> Option<WorkerGuard> where
        P : AsRef<Path>
    {
        let stderr_log = fmt::layer();
        let env_filter = EnvFilter::from_default_env();
        let r = registry().with(stderr_log).with(env_filter);

        let flush_guard = match logfile {
            Some(p) => {
                let logfile = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(p).unwrap();
                let (writer, _guard) = non_blocking::NonBlockingBuilder::default()
                    .lossy(false)
                    .finish(logfile);
                let json = fmt::layer()
                    .json()
                    .with_span_list(true)
                    .with_current_span(false)
                    .with_writer(writer);

                let r = r.with(json);
                if is_test { r.try_init().ok(); }
                else { r.init(); }
                Some(_guard)
            },
            None => {
                if is_test { r.try_init().ok(); }
                else { r.init(); }
                None
            }
        };
        return flush_guard
    }

    pub fn init_logging(logfile: Option<impl AsRef<Path>>) -> Option<WorkerGuard> {
        return build_and_set_global_subscriber(logfile, false);
    }

    #[allow(dead_code)]
    pub(crate) fn init_test_logging(logfile: Option<impl AsRef<Path>>) -> Option<WorkerGuard> {
        return build_and_set_global_subscriber(logfile, true);
    }
}
pub use logging_setup::*;


#[macro_export]
macro_rules! map (
    { $($key:expr => $value:expr),+ } => {
        {
            let mut m = Map::default();
            $(
                m.insert($key, $value);
            )+
            m
        }
     };
);


pub(crate) mod utils {
    use num;
    use std::ops::ShrAssign;

    pub struct Biterator<B> {
        bits : B,
        ones : u32,
        next_index: u32,
    }

    impl<B : num::Unsigned + num::PrimInt> Biterator<B> {
        pub fn new(val : B) -> Self {
            Self{ bits: val, ones: 0, next_index: 0 }
        }
    }

    impl<B : num::Unsigned + num::Zero + num::PrimInt + ShrAssign + From<u32>> Iterator for Biterator<B> {
        type Item = u32;

        fn next(&mut self) -> Option<Self::Item> {
            if self.ones > 0 {
                let val = self.next_index;
                self.ones -= 1;
                self.next_index += 1;
                return Some(val);
            } else if self.bits.is_zero() {
                return None;
            } else {
                let nz = self.bits.trailing_zeros();
                self.bits >>= nz.into();
                self.next_index += nz;
                let no = (!self.bits).trailing_zeros();
                self.ones = no;
                self.bits >>= no.into();
                return self.next();
            }
        }
    }


    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn biterate() {
            fn get_inds(val : u128) -> Vec<u32> {
                return Biterator::new(val).collect();
            }

            assert_eq!(get_inds(0), Vec::<u32>::new());
            assert_eq!(get_inds(1), vec![0u32]);
            assert_eq!(get_inds(0b100100110), vec![1,2,5,8]);
            assert_eq!(get_inds(0b11111), vec![0,1,2,3,4]);
            assert_eq!(get_inds(1u128 << 127), vec![127]);
        }

    }
}
