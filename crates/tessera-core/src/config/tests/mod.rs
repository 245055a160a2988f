// Configuration test module
#[cfg(test)]
mod config_tests;
