//! Integration tests for livequery sessions

mod config_layering;
mod session_scenarios;
mod support;
mod test_utils;
