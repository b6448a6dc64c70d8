//! Headless harness for exercising Weave render roots in tests.

pub mod testing;

pub use testing::*;

pub mod prelude {
    pub use crate::testing::{run_test_root, TestRoot, TestScheduler};
}
