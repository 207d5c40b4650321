mod yaml_runner;

pub use yaml_runner::{load_test_cases_from_str, run_offline_test, TestCase, TestResult};
