//! This module contains models that predict the next bit in a sequence of bits.

pub mod gate;
pub mod lstm;
pub mod model;
