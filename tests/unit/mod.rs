mod arbitration_tests;
mod book_tests;
mod config_tests;
mod spread_table_tests;
