//! Integration tests for the versioned content-addressed filesystem.

mod copy;
mod history;
mod ldfile;
mod merge_scenarios;
mod persistence;
mod test_utils;
mod write_cat_rm;
