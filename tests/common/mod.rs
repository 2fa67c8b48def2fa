#![allow(dead_code, unused_imports)]

pub use stampede_test_utils::builders;
pub use stampede_test_utils::fake_executor;
pub use stampede_test_utils::{init_tracing, with_timeout};
