//! Feeds arbitrary bytes through the csv reader and the round parser. Both
//! must reject bad input with an error rather than panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use teamchess::{
    tournaments::rounds::import::transform::transform, workbook::read_rows,
};

fuzz_target!(|data: &[u8]| {
    if let Ok(rows) = read_rows("round.csv", data) {
        let _ = transform(&rows, "round.csv", None);
    }
});
