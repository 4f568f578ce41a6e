//! Plugin System Tests
//!
//! Discovery, registration and dispatch tests with mock plugins.
