pub mod polar_test;
