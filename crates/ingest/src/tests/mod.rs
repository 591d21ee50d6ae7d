//! End-to-end pipeline tests with in-memory collaborators.

mod fakes;
