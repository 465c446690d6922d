//! Physical parameters, derived kernel coefficients and pipeline constants.

use std::f64::consts::PI;

use crate::error::ConfigurationError;

/// Sentinel in the cell bucket table for a cell with no particles.
pub const NO_CELL_ID: u32 = u32::MAX;

/// Sentinel for an empty neighbor or connection slot.
pub const NO_PARTICLE_ID: u32 = u32::MAX;

/// Neighbor-list slots per particle unless configured otherwise.
pub const DEFAULT_NEIGHBOR_CAPACITY: usize = 32;

/// Predictor-corrector passes per step unless configured otherwise.
pub const DEFAULT_PCISPH_ITERATIONS: u32 = 3;

/// Dispatch granularity; global work sizes are rounded up to a multiple.
pub const WORK_GROUP_SIZE: usize = 256;

/// Physical constants of the fluid and the scene.
///
/// Lengths in positions and bounds are in scene units; `simulation_scale`
/// converts them to metres for every force and density computation.
#[derive(Clone, Debug, PartialEq)]
pub struct SphParams {
    /// Smoothing radius in scene units. Also the grid cell size.
    pub h: f32,
    /// Mass of every particle, kg.
    pub mass: f32,
    /// Rest density `RHO0`, kg/m³.
    pub rest_density: f32,
    /// Metres per scene unit.
    pub simulation_scale: f32,
    /// Dynamic viscosity coefficient.
    pub viscosity: f32,
    /// Pressure per unit of density excess used for the initial estimate.
    pub stiffness: f32,
    /// Velocity scale factor applied when a particle hits the bounding box.
    pub damping: f32,
    /// Gravity, m/s².
    pub gravity: [f32; 3],
    /// Spring acceleration per metre of stretch at unit connection stiffness.
    pub elasticity: f32,
    /// Contraction acceleration of a fully activated muscle connection.
    pub muscle_acceleration: f32,
}

impl SphParams {
    /// Default smoothing radius.
    pub const DEFAULT_H: f32 = 3.34;
    /// Default particle mass.
    pub const DEFAULT_MASS: f32 = 0.0003;
    /// Default rest density.
    pub const DEFAULT_REST_DENSITY: f32 = 1000.0;
    /// Default scene-to-metre scale.
    pub const DEFAULT_SIMULATION_SCALE: f32 = 0.004;
    /// Default time step, seconds.
    pub const DEFAULT_TIME_STEP: f32 = 0.0005;

    /// Check every parameter for range and finiteness.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        positive("h", self.h)?;
        positive("mass", self.mass)?;
        positive("rest_density", self.rest_density)?;
        positive("simulation_scale", self.simulation_scale)?;
        non_negative("viscosity", self.viscosity)?;
        non_negative("stiffness", self.stiffness)?;
        non_negative("elasticity", self.elasticity)?;
        non_negative("muscle_acceleration", self.muscle_acceleration)?;
        if !(0.0..=1.0).contains(&self.damping) {
            return Err(ConfigurationError::InvalidParameter {
                name: "damping",
                reason: format!("must be within [0, 1], got {}", self.damping),
            });
        }
        if self.gravity.iter().any(|g| !g.is_finite()) {
            return Err(ConfigurationError::InvalidParameter {
                name: "gravity",
                reason: format!("components must be finite, got {:?}", self.gravity),
            });
        }
        Ok(())
    }

    /// Smoothing radius in metres.
    pub fn scaled_h(&self) -> f32 {
        self.h * self.simulation_scale
    }

    /// Derive the kernel coefficients for a given time step.
    pub fn coefficients(&self, time_step: f32) -> Result<KernelCoefficients, ConfigurationError> {
        self.validate()?;
        positive("time_step", time_step)?;

        let h = f64::from(self.scaled_h());
        let poly6 = 315.0 / (64.0 * PI * h.powi(9));
        let spiky_gradient = -45.0 / (PI * h.powi(6));
        let viscosity_laplacian = 45.0 / (PI * h.powi(6));
        let delta = pcisph_delta(
            h,
            f64::from(self.mass),
            f64::from(self.rest_density),
            f64::from(time_step),
            spiky_gradient,
        );

        Ok(KernelCoefficients {
            h: h as f32,
            h2: (h * h) as f32,
            poly6: poly6 as f32,
            spiky_gradient: spiky_gradient as f32,
            viscosity_laplacian: viscosity_laplacian as f32,
            delta: delta as f32,
            time_step,
        })
    }
}

impl Default for SphParams {
    fn default() -> Self {
        Self {
            h: Self::DEFAULT_H,
            mass: Self::DEFAULT_MASS,
            rest_density: Self::DEFAULT_REST_DENSITY,
            simulation_scale: Self::DEFAULT_SIMULATION_SCALE,
            viscosity: 10.0,
            stiffness: 0.75,
            damping: 0.75,
            gravity: [0.0, -9.8, 0.0],
            elasticity: 4000.0,
            muscle_acceleration: 40.0,
        }
    }
}

/// Smoothing-kernel coefficients and the PCISPH correction factor, all at
/// simulation scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KernelCoefficients {
    /// Smoothing radius, metres.
    pub h: f32,
    /// `h²`.
    pub h2: f32,
    /// Poly6 normalisation, `315 / (64 π h⁹)`.
    pub poly6: f32,
    /// Spiky gradient normalisation, `-45 / (π h⁶)`.
    pub spiky_gradient: f32,
    /// Viscosity Laplacian normalisation, `45 / (π h⁶)`.
    pub viscosity_laplacian: f32,
    /// Pressure change per unit of predicted density error (`DELTA`).
    pub delta: f32,
    /// Step size the coefficients were derived for, seconds.
    pub time_step: f32,
}

/// `DELTA` for a filled neighborhood: a prototype particle on a cubic
/// lattice of spacing `h / 2`.
fn pcisph_delta(h: f64, mass: f64, rest_density: f64, dt: f64, spiky_gradient: f64) -> f64 {
    let spacing = 0.5 * h;
    let mut grad_sum = [0.0f64; 3];
    let mut grad_dot = 0.0f64;
    for ix in -3i32..=3 {
        for iy in -3i32..=3 {
            for iz in -3i32..=3 {
                let r = [
                    f64::from(ix) * spacing,
                    f64::from(iy) * spacing,
                    f64::from(iz) * spacing,
                ];
                let len = (r[0] * r[0] + r[1] * r[1] + r[2] * r[2]).sqrt();
                if len <= 0.0 || len >= h {
                    continue;
                }
                let scale = spiky_gradient * (h - len) * (h - len) / len;
                let grad = [scale * r[0], scale * r[1], scale * r[2]];
                for k in 0..3 {
                    grad_sum[k] += grad[k];
                }
                grad_dot += grad[0] * grad[0] + grad[1] * grad[1] + grad[2] * grad[2];
            }
        }
    }
    let beta = 2.0 * (dt * mass / rest_density).powi(2);
    let sum_sq = grad_sum[0] * grad_sum[0] + grad_sum[1] * grad_sum[1] + grad_sum[2] * grad_sum[2];
    1.0 / (beta * (sum_sq + grad_dot))
}

fn positive(name: &'static str, value: f32) -> Result<(), ConfigurationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigurationError::InvalidParameter {
            name,
            reason: format!("must be finite and positive, got {value}"),
        });
    }
    Ok(())
}

fn non_negative(name: &'static str, value: f32) -> Result<(), ConfigurationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigurationError::InvalidParameter {
            name,
            reason: format!("must be finite and non-negative, got {value}"),
        });
    }
    Ok(())
}
