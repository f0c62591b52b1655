mod cli_test;
mod common;
mod explore_test;
mod resume_test;
