pub mod accumulate_test;
