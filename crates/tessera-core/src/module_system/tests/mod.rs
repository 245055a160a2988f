// Module system test modules
#[cfg(test)]
mod definition_tests;
#[cfg(test)]
mod resolver_tests;
