// syscell — Cycle-accurate simulator for fixed-point systolic Cholesky cells
//
// Library root. Cell models, the clocked driver, the .cell configuration
// front end and the randomized testbench.

pub mod ast;
pub mod cell;
pub mod config;
pub mod diag;
pub mod edge;
pub mod error;
pub mod fixed;
pub mod interior;
pub mod lexer;
pub mod parser;
pub mod report;
pub mod sim;
pub mod stimulus;
pub mod testbench;
pub mod timing;
pub mod trace;
