pub mod driver_test;
