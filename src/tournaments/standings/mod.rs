//! Team standings, recomputed from the stored team pairings after every
//! round upload.

pub mod compute;
