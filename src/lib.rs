//! A LEGv8 parser and simulator.
//!
//! This is a simulation suite for the LEGv8 dialect of ARMv8 assembly
//! used in undergraduate architecture courses.
//!
//! # Usage
//!
//! To execute LEGv8 source code, it must first be parsed into a [`Program`]:
//! ```
//! use legv8_ensemble::parse::parse_program;
//!
//! let src = "
//!     ADDI X1, XZR, #5
//!     ADDI X2, XZR, #7
//!     ADD  X3, X1, X2";
//! let program = parse_program(src).unwrap();
//! ```
//!
//! Once a program has been created, it can be executed with the simulator:
//! ```
//! # use legv8_ensemble::parse::parse_program;
//! # let program = parse_program("ADD X3, X1, X2").unwrap();
//! use legv8_ensemble::sim::Simulator;
//!
//! let mut simulator = Simulator::default();
//! simulator.load(program).unwrap();
//! simulator.run().unwrap(); // <-- handle the Result as needed
//! ```
//!
//! Registers and memory start out holding random bits, modeling undefined
//! initial state. Tests (and reproducible runs) can pin them down with a
//! [`FillStrategy`]:
//! ```
//! use legv8_ensemble::ast::reg_consts::X3;
//! use legv8_ensemble::parse::parse_program;
//! use legv8_ensemble::sim::mem::FillStrategy;
//! use legv8_ensemble::sim::{SimFlags, Simulator};
//!
//! let program = parse_program("
//!     ADDI X1, XZR, #5
//!     ADDI X2, XZR, #7
//!     ADD  X3, X1, X2
//! ").unwrap();
//!
//! let flags = SimFlags { fill_strat: FillStrategy::Seeded { seed: 2110 } };
//! let mut simulator = Simulator::new(flags);
//! simulator.load(program).unwrap();
//! simulator.run().unwrap();
//! assert_eq!(simulator.reg_file.get(X3), 12);
//! ```
//!
//! If more granularity is needed, the simulator can be stepped one
//! instruction at a time. See the [`sim`] module for more details.
//!
//! [`Program`]: crate::ast::Program
//! [`FillStrategy`]: crate::sim::mem::FillStrategy
#![warn(missing_docs)]

pub mod ast;
pub mod err;
pub mod parse;
pub mod sim;
