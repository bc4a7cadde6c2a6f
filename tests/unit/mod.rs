//! Unit tests for the analysis rules
