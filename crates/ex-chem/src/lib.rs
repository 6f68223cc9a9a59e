//! ex-chem: physiologic equilibrium solver.
//!
//! Pure functions only. Every solver call takes its inputs by value and
//! returns a fresh result, so compartments can be solved in any order without
//! hidden shared state.
//!
//! - [`brent`]: bracketed scalar root finding
//! - [`acid_base`]: hydrogen ion balance from total CO2 and strong ions
//! - [`oxygen`]: pO2/SO2 from total O2 via a shifted dissociation curve
//! - [`gas`]: ideal-gas composition of humidified gas mixtures

pub mod acid_base;
pub mod brent;
pub mod error;
pub mod gas;
pub mod oxygen;

pub use acid_base::{AcidBase, AcidBaseConstants, AcidBaseInput, solve_acid_base};
pub use brent::{BrentConfig, BrentRoot, find_root};
pub use error::{ChemError, ChemResult};
pub use gas::{GasMixture, GasSpecies, InspiredGas};
pub use oxygen::{OxygenInput, Oxygenation, solve_oxygenation};
