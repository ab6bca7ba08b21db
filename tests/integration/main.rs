mod sampling_test;

#[cfg(feature = "z3")]
mod cli_test;
