// Experience duration heuristics: ordered matchers plus the aggregating calculator.

pub mod calculator;
pub mod matchers;
