#![no_main]

use libfuzzer_sys::fuzz_target;
use msialign::align::{AlignmentConfig, AlignmentEstimator, ReferenceSpectrum};
use msialign::dataset::SampleEncoding;
use msialign::transform::SharedTransformGuard;
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    // First byte picks the mode, the rest is a raw f32 spectrum
    let Some((&mode, body)) = data.split_first() else {
        return;
    };
    let channels = body.len() / 4;
    if channels == 0 || channels > 4096 {
        return;
    }

    let mut spectrum = vec![0.0; channels];
    SampleEncoding::Float32.decode_into(&body[..channels * 4], &mut spectrum);

    let mass: Vec<f64> = (0..channels).map(|i| 100.0 + 0.01 * i as f64).collect();
    let intensity: Vec<f64> = (0..channels).map(|i| ((i % 17) as f64).sin().abs()).collect();
    let Ok(reference) = ReferenceSpectrum::new(mass, intensity) else {
        return;
    };

    let config = AlignmentConfig::default()
        .with_threads(1)
        .with_bilinear(mode & 1 == 1)
        .with_iterations(1 + (mode as usize >> 1) % 4);
    let Ok(mut estimator) =
        AlignmentEstimator::new(Arc::new(reference), &config, SharedTransformGuard::shared())
    else {
        return;
    };

    // Never panics, whatever the samples hold
    if let Ok(lags) = estimator.align_and_correct(&mut spectrum) {
        let bounds = estimator.max_lags();
        assert!(lags.low.abs() <= bounds.low || lags.low.is_nan());
        assert!(lags.high.abs() <= bounds.high || lags.high.is_nan());
    }
});
