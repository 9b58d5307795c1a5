pub mod remap_test;
