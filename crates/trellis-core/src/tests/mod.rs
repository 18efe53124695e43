pub(crate) mod support;

mod node_tests;
mod property_tests;
