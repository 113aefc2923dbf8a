//! Mode 01 getters, one module per 0x20-wide PID range.
//!
//! Every getter returns `None` when the ECU does not answer, answers
//! negatively or sends fewer bytes than the PID defines.

mod range_01_20;
mod range_21_40;
mod range_41_60;
mod range_61_80;
mod range_81_e0;
