/// Server protocol implementations.
pub mod triton;
