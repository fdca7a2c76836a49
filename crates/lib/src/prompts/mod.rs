//! # Prompt Templates
//!
//! This module organizes the prompt templates used throughout the `admitrag` library.

pub mod core;
