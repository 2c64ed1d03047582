//! Cross-crate integration tests for the Fides protocol live in `tests/`.
