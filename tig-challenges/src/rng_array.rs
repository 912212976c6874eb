use rand::{
    distributions::{uniform::SampleUniform, Distribution, Uniform},
    rngs::StdRng,
    Rng, SeedableRng,
};

/// Reproducible random stream driven by eight seeds.
///
/// Every draw first uses the current generator to pick which of the eight
/// generators serves the draw. Identical seeds always give identical streams.
pub struct RngArray {
    rngs: [StdRng; 8],
    index: u32,
}

impl RngArray {
    pub fn new(seeds: [u64; 8]) -> Self {
        Self {
            rngs: seeds.map(StdRng::seed_from_u64),
            index: 0,
        }
    }

    pub fn get_mut(&mut self) -> &mut StdRng {
        self.index = self.rngs[self.index as usize].gen_range(0..8);
        &mut self.rngs[self.index as usize]
    }

    /// Samples from `[low, high)`. Panics if `low >= high`.
    pub fn sample_uniform<T>(&mut self, low: T, high: T) -> T
    where
        T: SampleUniform + PartialOrd + Copy,
    {
        Uniform::from(low..high).sample(self.get_mut())
    }

    /// Fills `out` in order with samples from `[low, high)`.
    pub fn fill_uniform(&mut self, out: &mut [f32], low: f32, high: f32) {
        let uniform = Uniform::from(low..high);
        let mut lanes = out.chunks_exact_mut(16);
        for lane in &mut lanes {
            for x in lane.iter_mut() {
                *x = uniform.sample(self.get_mut());
            }
        }
        for x in lanes.into_remainder() {
            *x = uniform.sample(self.get_mut());
        }
    }
}
