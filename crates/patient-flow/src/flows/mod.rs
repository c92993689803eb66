//! Patient-flow domains. Admissions is the only flow today; intake/triage
//! submissions and equipment tracking would land as sibling modules.

pub mod admissions;
