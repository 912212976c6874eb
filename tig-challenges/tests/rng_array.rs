use tig_challenges::RngArray;

const SEEDS: [u64; 8] = [1, 2, 3, 4, 5, 6, 7, 8];

#[test]
fn test_same_seeds_same_stream() {
    let mut a = RngArray::new(SEEDS);
    let mut b = RngArray::new(SEEDS);
    for _ in 0..1000 {
        assert_eq!(
            a.sample_uniform(0.0f32, 1.0f32),
            b.sample_uniform(0.0f32, 1.0f32)
        );
    }
}

#[test]
fn test_different_seeds_different_stream() {
    let mut a = RngArray::new(SEEDS);
    let mut b = RngArray::new([8, 7, 6, 5, 4, 3, 2, 1]);
    let xs: Vec<f64> = (0..32).map(|_| a.sample_uniform(0.0, 1.0)).collect();
    let ys: Vec<f64> = (0..32).map(|_| b.sample_uniform(0.0, 1.0)).collect();
    assert_ne!(xs, ys);
}

#[test]
fn test_samples_in_range() {
    let mut rngs = RngArray::new(SEEDS);
    for _ in 0..10_000 {
        let x = rngs.sample_uniform(-2.5f32, 4.0f32);
        assert!((-2.5..4.0).contains(&x));
    }
}

#[test]
fn test_fill_matches_sequential_samples() {
    // 37 floats covers two full 16-wide lanes plus a remainder
    let mut filled = vec![0.0f32; 37];
    RngArray::new(SEEDS).fill_uniform(&mut filled, 0.0, 1.0);

    let mut rngs = RngArray::new(SEEDS);
    let sampled: Vec<f32> = (0..37).map(|_| rngs.sample_uniform(0.0, 1.0)).collect();
    assert_eq!(filled, sampled);
}
