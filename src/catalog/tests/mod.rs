//! Unit tests for catalog services and adapters.

mod support;
