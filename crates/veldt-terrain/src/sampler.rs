//! Height and material sampling for block geometry.
//!
//! The terrain core never generates heights itself; it pulls them through
//! [`HeightSource`] one vertex at a time. The bundled [`FbmHeightSource`]
//! composites multiple octaves of simplex noise for natural-looking terrain.

use noise::{NoiseFn, Simplex};
use veldt_math::GridRect;

/// One sampled terrain point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeightSample {
    /// Surface height at the queried point.
    pub height: f32,
    /// Material blend factor in [0, 1] consumed by the shading backend.
    pub material_blend: f32,
}

/// Supplies terrain data per grid vertex.
///
/// Implementations must be pure with respect to position: the same
/// coordinates always yield the same sample, otherwise adjacent blocks
/// sampled on different ticks would disagree along their shared edges.
pub trait HeightSource: Send + Sync {
    /// Sample height and material at a world grid position.
    fn sample(&self, x: f64, z: f64) -> HeightSample;

    /// Whether data for the given region can be sampled this tick.
    ///
    /// Returning `false` is not an error: the traversal skips the block and
    /// retries next tick.
    fn is_ready(&self, _region: &GridRect) -> bool {
        true
    }
}

/// Configuration for multi-octave fractal Brownian motion noise.
#[derive(Clone, Debug)]
pub struct FbmParams {
    /// World seed for deterministic generation.
    pub seed: u64,
    /// Number of noise octaves to composite.
    pub octaves: u32,
    /// Frequency multiplier between successive octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between successive octaves.
    pub persistence: f64,
    /// Frequency of the first (lowest) octave.
    pub base_frequency: f64,
    /// Amplitude of the first octave in world units.
    pub amplitude: f64,
}

impl Default for FbmParams {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 6,
            lacunarity: 2.0,
            persistence: 0.5,
            base_frequency: 0.01,
            amplitude: 24.0,
        }
    }
}

/// Fractal Brownian motion height source over simplex noise.
///
/// Each successive octave doubles in frequency and halves in amplitude,
/// producing self-similar detail at progressively finer scales. A second,
/// low-frequency noise channel drives the material blend.
pub struct FbmHeightSource {
    height_noise: Simplex,
    material_noise: Simplex,
    params: FbmParams,
}

impl FbmHeightSource {
    /// Create a new source with the given parameters.
    pub fn new(params: FbmParams) -> Self {
        Self {
            height_noise: Simplex::new(params.seed as u32),
            material_noise: Simplex::new(params.seed.wrapping_add(1) as u32),
            params: params.clone(),
        }
    }

    /// Theoretical maximum absolute height (geometric series over octaves).
    pub fn max_amplitude(&self) -> f64 {
        let mut sum = 0.0;
        let mut amp = self.params.amplitude;
        for _ in 0..self.params.octaves {
            sum += amp;
            amp *= self.params.persistence;
        }
        sum
    }

    /// The parameters this source was built with.
    pub fn params(&self) -> &FbmParams {
        &self.params
    }
}

impl HeightSource for FbmHeightSource {
    fn sample(&self, x: f64, z: f64) -> HeightSample {
        let mut total = 0.0;
        let mut frequency = self.params.base_frequency;
        let mut amplitude = self.params.amplitude;

        for _ in 0..self.params.octaves {
            total += self.height_noise.get([x * frequency, z * frequency]) * amplitude;
            frequency *= self.params.lacunarity;
            amplitude *= self.params.persistence;
        }

        let material = self
            .material_noise
            .get([x * self.params.base_frequency, z * self.params.base_frequency]);

        HeightSample {
            height: total as f32,
            material_blend: (material as f32 * 0.5 + 0.5).clamp(0.0, 1.0),
        }
    }
}

/// Flat terrain at a fixed height. Used by tests and as a stand-in source.
#[derive(Clone, Copy, Debug)]
pub struct ConstantHeightSource {
    /// The height returned everywhere.
    pub height: f32,
}

impl ConstantHeightSource {
    /// Create a source that returns `height` everywhere.
    pub fn new(height: f32) -> Self {
        Self { height }
    }
}

impl HeightSource for ConstantHeightSource {
    fn sample(&self, _x: f64, _z: f64) -> HeightSample {
        HeightSample {
            height: self.height,
            material_blend: 0.0,
        }
    }
}
