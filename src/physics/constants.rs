//! Physical constants (SI, CODATA 2018 as shipped with scipy).

/// Gravitational constant [m^3 kg^-1 s^-2].
pub const G: f64 = 6.674_30e-11;

/// Boltzmann constant [J K^-1].
pub const K_B: f64 = 1.380_649e-23;

/// Electron mass [kg].
pub const M_E: f64 = 9.109_383_701_5e-31;

/// Proton mass [kg].
pub const M_P: f64 = 1.672_621_923_69e-27;

/// Hydrogen atom mass [kg].
pub const M_H: f64 = M_E + M_P;

/// Astronomical unit [m].
pub const AU: f64 = 1.495_978_707e11;

/// Solar mass [kg].
pub const M_SUN: f64 = 1.9891e30;

/// Speed of light [m/s].
pub const C_LIGHT: f64 = 2.997_924_58e8;
