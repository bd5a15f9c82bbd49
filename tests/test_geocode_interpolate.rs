use ndarray::Array2;
use num_traits::Zero;
use sargeo::core::{
    interpolate, BilinearInterpolator, CancellationToken, GeocodeBlock, GeocodeParams,
    InterpolationMethod, Interpolator, NearestInterpolator, Resampler,
};
use sargeo::types::{BlockOrigin, PixelMap, SarComplex, SarComplex64, SarError};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn checker_block(rows: usize, cols: usize) -> Array2<SarComplex> {
    Array2::from_shape_fn((rows, cols), |(i, j)| {
        SarComplex::new((i as f32).sin() + j as f32, (j as f32).cos() - i as f32)
    })
}

fn unit_phase(angle: f64) -> SarComplex64 {
    SarComplex64::from_polar(1.0, angle)
}

/// Reference value for an in-bounds pixel
fn expected(interp: &dyn Interpolator, block: &Array2<SarComplex>, x: f64, y: f64, phase: SarComplex64) -> SarComplex {
    let v = interp.interpolate(block, x, y);
    let out = SarComplex64::new(v.re as f64, v.im as f64) * phase.conj();
    SarComplex::new(out.re as f32, out.im as f32)
}

#[test]
fn test_in_bounds_pixels_match_interpolator_with_phase_removed() {
    init_logging();

    let radar = checker_block(32, 40);
    let (geo_rows, geo_cols) = (6, 7);
    let n = geo_rows * geo_cols;
    let origin = BlockOrigin::new(100, 250);

    let radar_x: Vec<f64> = (0..n).map(|k| 250.0 + 2.0 + (k as f64) * 0.83).collect();
    let radar_y: Vec<f64> = (0..n).map(|k| 100.0 + 1.5 + (k as f64) * 0.61).collect();
    let phase: Vec<SarComplex64> = (0..n).map(|k| unit_phase(k as f64 * 0.37)).collect();

    let mut geo = Array2::from_elem((geo_rows, geo_cols), SarComplex::new(99.0, 99.0));
    let interp = BilinearInterpolator;
    let summary = interpolate(
        &radar,
        &mut geo,
        &radar_x,
        &radar_y,
        &phase,
        40,
        32,
        origin.azimuth_first_line,
        origin.range_first_pixel,
        &interp,
        1,
    )
    .expect("Interpolation failed");

    assert_eq!(summary.total_pixels, n);
    assert_eq!(summary.valid_pixels, n);
    for k in 0..n {
        let x = radar_x[k] - 250.0;
        let y = radar_y[k] - 100.0;
        let want = expected(&interp, &radar, x, y, phase[k]);
        assert_eq!(geo[[k / geo_cols, k % geo_cols]], want, "pixel {}", k);
    }
}

#[test]
fn test_out_of_bounds_pixels_are_zero() {
    init_logging();

    let radar = checker_block(8, 8);
    let margin = 2;
    // Translated coordinates: inside [2, 6) is valid
    let cases = [
        (4.0, 4.0, true),
        (2.0, 2.0, true),
        (5.99, 5.99, true),
        (1.99, 4.0, false),
        (6.0, 4.0, false),
        (4.0, 6.0, false),
        (-3.0, 4.0, false),
        (f64::NAN, 4.0, false),
        (4.0, f64::INFINITY, false),
    ];
    let radar_x: Vec<f64> = cases.iter().map(|c| c.0 + 10.0).collect();
    let radar_y: Vec<f64> = cases.iter().map(|c| c.1 + 20.0).collect();
    let phase = vec![SarComplex64::new(1.0, 0.0); cases.len()];

    let mut geo = Array2::from_elem((1, cases.len()), SarComplex::new(5.0, 5.0));
    let summary = interpolate(
        &radar,
        &mut geo,
        &radar_x,
        &radar_y,
        &phase,
        8,
        8,
        20,
        10,
        &BilinearInterpolator,
        margin,
    )
    .unwrap();

    for (k, case) in cases.iter().enumerate() {
        if case.2 {
            assert_ne!(geo[[0, k]], SarComplex::zero(), "case {:?}", case);
        } else {
            assert_eq!(geo[[0, k]], SarComplex::zero(), "case {:?}", case);
        }
    }
    assert_eq!(summary.valid_pixels, 3);
}

#[test]
fn test_valid_extent_smaller_than_allocation() {
    let radar = checker_block(10, 10);
    let mut geo = Array2::zeros((1, 2));
    // Valid extent is 5x5 inside a 10x10 allocation
    interpolate(
        &radar,
        &mut geo,
        &[3.0, 7.0],
        &[3.0, 3.0],
        &[SarComplex64::new(1.0, 0.0); 2],
        5,
        5,
        0,
        0,
        &NearestInterpolator,
        1,
    )
    .unwrap();
    assert_eq!(geo[[0, 0]], radar[[3, 3]]);
    assert_eq!(geo[[0, 1]], SarComplex::zero());
}

#[test]
fn test_small_margin_cannot_expose_padding_to_kernel() {
    // 6x6 valid extent inside an 8x8 allocation whose padding holds garbage
    let radar = Array2::from_shape_fn((8, 8), |(i, j)| {
        if i >= 6 || j >= 6 {
            SarComplex::new(1.0e6, 0.0)
        } else {
            SarComplex::new(1.0, 0.0)
        }
    });
    let params = GeocodeParams {
        interpolation: InterpolationMethod::Bicubic,
        margin: Some(1),
        ..Default::default()
    };
    let resampler = Resampler::new(&params).unwrap();
    assert_eq!(resampler.margin(), 2);

    let radar_x = [4.5, 3.5];
    let radar_y = [3.0, 3.0];
    let phase = [SarComplex64::new(1.0, 0.0); 2];

    // Direct call with the undersized margin is clamped the same way
    let mut geo = Array2::zeros((1, 2));
    let summary = interpolate(
        &radar,
        &mut geo,
        &radar_x,
        &radar_y,
        &phase,
        6,
        6,
        0,
        0,
        resampler.interpolator(),
        1,
    )
    .unwrap();

    assert_eq!(summary.valid_pixels, 1);
    // x = 4.5 would need taps at column 6
    assert_eq!(geo[[0, 0]], SarComplex::zero());
    assert!((geo[[0, 1]] - SarComplex::new(1.0, 0.0)).norm() < 1e-5);
}

#[test]
fn test_geometrical_phase_is_removed() {
    let mut radar = Array2::from_elem((4, 4), SarComplex::zero());
    // Sample carrying a known phase of 0.9 rad
    radar[[2, 2]] = SarComplex::from_polar(3.0, 0.9);
    let mut geo = Array2::zeros((1, 1));
    interpolate(
        &radar,
        &mut geo,
        &[2.0],
        &[2.0],
        &[unit_phase(0.9)],
        4,
        4,
        0,
        0,
        &NearestInterpolator,
        1,
    )
    .unwrap();
    let out = geo[[0, 0]];
    assert!((out.norm() - 3.0).abs() < 1e-5);
    assert!(out.arg().abs() < 1e-5);
}

#[test]
fn test_sinc_resampler_reproduces_samples_on_grid() {
    init_logging();

    let radar = checker_block(24, 24);
    let params = GeocodeParams {
        interpolation: InterpolationMethod::Sinc,
        ..Default::default()
    };
    let resampler = Resampler::new(&params).unwrap();
    assert_eq!(resampler.margin(), 4);

    let pixels = PixelMap::new(
        vec![10.0, 12.0, 2.0],
        vec![11.0, 9.0, 10.0],
        vec![SarComplex64::new(1.0, 0.0); 3],
    )
    .unwrap();
    let block = GeocodeBlock::new(&radar, BlockOrigin::default(), &pixels, (1, 3));
    let mut geo = Array2::zeros((1, 3));
    let summary = resampler.resample_block(&block, &mut geo).unwrap();

    assert_eq!(summary.valid_pixels, 2);
    for (k, (row, col)) in [(11usize, 10usize), (9, 12)].iter().enumerate() {
        let want = radar[[*row, *col]];
        assert!((geo[[0, k]] - want).norm() < 5e-3, "pixel {}", k);
    }
    // x = 2.0 sits inside the sinc margin
    assert_eq!(geo[[0, 2]], SarComplex::zero());
}

#[test]
fn test_resample_blocks_with_cancellation() {
    init_logging();

    let radar = checker_block(16, 16);
    let pixels = PixelMap::new(
        vec![5.0, 6.5],
        vec![5.0, 7.25],
        vec![SarComplex64::new(1.0, 0.0); 2],
    )
    .unwrap();
    let blocks = vec![
        GeocodeBlock::new(&radar, BlockOrigin::default(), &pixels, (1, 2)),
        GeocodeBlock::new(&radar, BlockOrigin::new(2, 2), &pixels, (2, 1)),
    ];
    let resampler = Resampler::new(&GeocodeParams::default()).unwrap();

    let cancel = CancellationToken::new();
    let outputs = resampler.resample_blocks(&blocks, &cancel).unwrap();
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[0].dim(), (1, 2));
    assert_eq!(outputs[1].dim(), (2, 1));
    assert_eq!(outputs[0][[0, 0]], radar[[5, 5]]);
    assert_eq!(outputs[1][[0, 0]], radar[[3, 3]]);

    cancel.cancel();
    let result = resampler.resample_blocks(&blocks, &cancel.clone());
    assert!(matches!(
        result,
        Err(SarError::Cancelled { completed: 0, total: 2 })
    ));
}

#[test]
fn test_geo_shape_mismatch_rejected() {
    let radar = checker_block(8, 8);
    let pixels = PixelMap::new(vec![4.0], vec![4.0], vec![SarComplex64::new(1.0, 0.0)]).unwrap();
    let block = GeocodeBlock::new(&radar, BlockOrigin::default(), &pixels, (1, 1));
    let resampler = Resampler::new(&GeocodeParams::default()).unwrap();
    let mut geo = Array2::zeros((2, 1));
    assert!(matches!(
        resampler.resample_block(&block, &mut geo),
        Err(SarError::InvalidInput(_))
    ));
}

#[test]
fn test_params_from_json() {
    let params: GeocodeParams =
        serde_json::from_str(r#"{"interpolation": "bicubic", "margin": 3}"#).unwrap();
    assert_eq!(params.interpolation, InterpolationMethod::Bicubic);
    assert_eq!(params.margin, Some(3));
    assert_eq!(params.sinc_table_size, GeocodeParams::default().sinc_table_size);
}

#[test]
fn test_pixel_map_length_invariant() {
    let result = PixelMap::new(vec![1.0, 2.0], vec![1.0], vec![SarComplex64::new(1.0, 0.0); 2]);
    assert!(matches!(result, Err(SarError::InvalidInput(_))));
}
